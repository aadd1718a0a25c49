//! Request/response descriptors: one schema per request type, interpreted in
//! four roles (client-encode, server-decode, server-encode, client-decode).
//! The tagged enum plus the match arms below stand in for the source's
//! visitor-over-request-variants: each variant names its own wire shape, and
//! adding a request means adding one match arm to each of the four
//! functions, not a new encoder/decoder class.

use crate::types::{
    Addr, CallFrame, CallStack, RegId, RegInfos, RegKind, ResumeType, Size, StoppedState,
    StoppedUpdate, SymId, SymbolInfos, VmInfos,
};
use crate::wire::codec::{Decoder, Encoder};
use crate::{Error, Result};

pub const TAG_CONNECT: i8 = 0;
pub const TAG_STOP: i8 = 1;
pub const TAG_CHECK_STOPPED: i8 = 2;
pub const TAG_GET_REGS: i8 = 3;
pub const TAG_GET_REGS_VAR: i8 = 4;
pub const TAG_SET_REGS: i8 = 5;
pub const TAG_SET_REGS_VAR: i8 = 6;
pub const TAG_GET_REGS_INFOS: i8 = 7;
pub const TAG_FIND_REGS_IDS: i8 = 8;
pub const TAG_READ_MEM: i8 = 9;
pub const TAG_READ_MEM_VAR: i8 = 10;
pub const TAG_WRITE_MEM: i8 = 11;
pub const TAG_WRITE_MEM_VAR: i8 = 12;
pub const TAG_GET_SYMS_BY_IDS: i8 = 13;
pub const TAG_GET_SYMS_BY_ADDR: i8 = 14;
pub const TAG_GET_SYMS_BY_NAMES: i8 = 15;
pub const TAG_GET_CODE_TEXT: i8 = 16;
pub const TAG_ADD_BKPS: i8 = 17;
pub const TAG_DEL_BKPS: i8 = 18;
pub const TAG_RESUME: i8 = 19;
pub const TAG_ERR: i8 = 100;

/// Per-element byte sizes for a vector of registers or memory spans. Callers
/// signal "every element is the same size" with `Uniform`; the wire chooses
/// the `_var` tag only for `Variable`. Kept verbatim per the open question in
/// the design notes: `n < 2` is always `Uniform`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sizes {
    Uniform(Size),
    Variable(Vec<Size>),
}

impl Sizes {
    /// Applies the "second entry zero, or fewer than two elements" uniform
    /// convention to a raw per-element size array, the same shape the CLI
    /// and client façade accept from callers.
    pub fn from_caller(raw: &[Size]) -> Self {
        if raw.len() < 2 || raw[1] == 0 {
            Sizes::Uniform(raw[0])
        } else {
            Sizes::Variable(raw.to_vec())
        }
    }

    pub fn expand(&self, n: usize) -> Vec<Size> {
        match self {
            Sizes::Uniform(s) => vec![*s; n],
            Sizes::Variable(v) => v.clone(),
        }
    }

    fn is_uniform(&self) -> bool {
        matches!(self, Sizes::Uniform(_))
    }
}

fn write_values(e: &mut Encoder, values: &[Vec<u8>]) {
    for v in values {
        e.write_bytes(v);
    }
}

fn read_values(d: &mut Decoder<'_>, sizes: &[Size]) -> Result<Vec<Vec<u8>>> {
    sizes
        .iter()
        .map(|&s| d.read_bytes(s as usize))
        .collect::<Result<Vec<_>>>()
}

fn write_reg_infos(e: &mut Encoder, infos: &[RegInfos]) {
    e.write_seq(infos, |e, ri| {
        e.write_u32(ri.id);
        e.write_string(&ri.name);
        e.write_u64(ri.size);
        e.write_i8(ri.kind.to_wire());
    });
}

fn read_reg_infos(d: &mut Decoder<'_>) -> Result<Vec<RegInfos>> {
    d.read_seq(|d| {
        let id = d.read_u32()?;
        let name = d.read_string()?;
        let size = d.read_u64()?;
        let kind = RegKind::from_wire(d.read_i8()?)?;
        Ok(RegInfos {
            id,
            name,
            size,
            kind,
            val: None,
        })
    })
}

fn write_symbol_infos(e: &mut Encoder, infos: &[SymbolInfos]) {
    e.write_seq(infos, |e, si| {
        e.write_u32(si.id);
        e.write_string(&si.name);
        e.write_u64(si.addr);
    });
}

fn read_symbol_infos(d: &mut Decoder<'_>) -> Result<Vec<SymbolInfos>> {
    d.read_seq(|d| {
        Ok(SymbolInfos {
            id: d.read_u32()?,
            name: d.read_string()?,
            addr: d.read_u64()?,
        })
    })
}

fn write_vm_infos(e: &mut Encoder, v: &VmInfos) {
    e.write_string(&v.name);
    e.write_u32(v.regs_count);
    e.write_seq(&v.regs_general, |e, r| e.write_u32(*r));
    e.write_seq(&v.regs_program_counter, |e, r| e.write_u32(*r));
    e.write_seq(&v.regs_stack_pointer, |e, r| e.write_u32(*r));
    e.write_seq(&v.regs_base_pointer, |e, r| e.write_u32(*r));
    e.write_seq(&v.regs_flags, |e, r| e.write_u32(*r));
    e.write_u64(v.memory_size);
    e.write_u32(v.symbols_count);
    e.write_u64(v.pointer_size);
    e.write_u64(v.integer_size);
    e.write_u8(v.use_opcode as u8);
}

fn read_vm_infos(d: &mut Decoder<'_>) -> Result<VmInfos> {
    Ok(VmInfos {
        name: d.read_string()?,
        regs_count: d.read_u32()?,
        regs_general: d.read_seq(|d| d.read_u32())?,
        regs_program_counter: d.read_seq(|d| d.read_u32())?,
        regs_stack_pointer: d.read_seq(|d| d.read_u32())?,
        regs_base_pointer: d.read_seq(|d| d.read_u32())?,
        regs_flags: d.read_seq(|d| d.read_u32())?,
        memory_size: d.read_u64()?,
        symbols_count: d.read_u32()?,
        pointer_size: d.read_u64()?,
        integer_size: d.read_u64()?,
        use_opcode: d.read_u8()? != 0,
    })
}

fn write_call_stack(e: &mut Encoder, stack: &CallStack) {
    e.write_seq(stack, |e, f| {
        e.write_u64(f.caller_start_addr);
        e.write_u64(f.call_addr);
    });
}

fn read_call_stack(d: &mut Decoder<'_>) -> Result<CallStack> {
    d.read_seq(|d| {
        Ok(CallFrame {
            caller_start_addr: d.read_u64()?,
            call_addr: d.read_u64()?,
        })
    })
}

fn write_stopped_update(e: &mut Encoder, u: &StoppedUpdate) {
    e.write_i8(u.vm_state.to_wire());
    e.write_u8(u.stopped as u8);
    e.write_u64(u.addr);
    write_call_stack(e, &u.stack);
}

fn read_stopped_update(d: &mut Decoder<'_>) -> Result<StoppedUpdate> {
    Ok(StoppedUpdate {
        vm_state: StoppedState::from_wire(d.read_i8()?)?,
        stopped: d.read_u8()? != 0,
        addr: d.read_u64()?,
        stack: read_call_stack(d)?,
    })
}

/// A request as sent by the client, before the server has filled in any
/// output.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Connect,
    Stop,
    CheckStopped,
    GetRegs { ids: Vec<RegId>, sizes: Sizes },
    SetRegs {
        ids: Vec<RegId>,
        sizes: Sizes,
        values: Vec<Vec<u8>>,
    },
    GetRegsInfos { ids: Vec<RegId> },
    FindRegsIds { names: Vec<String> },
    ReadMem { addrs: Vec<Addr>, sizes: Sizes },
    WriteMem {
        addrs: Vec<Addr>,
        sizes: Sizes,
        values: Vec<Vec<u8>>,
    },
    GetSymsByIds { ids: Vec<SymId> },
    GetSymsByAddr { addr: Addr, size: Size },
    GetSymsByNames { names: Vec<String> },
    GetCodeText { addr: Addr, nins: u64 },
    AddBkps { addrs: Vec<Addr> },
    DelBkps { addrs: Vec<Addr> },
    Resume { ty: ResumeType },
}

impl Request {
    pub fn tag(&self) -> i8 {
        match self {
            Request::Connect => TAG_CONNECT,
            Request::Stop => TAG_STOP,
            Request::CheckStopped => TAG_CHECK_STOPPED,
            Request::GetRegs { sizes, .. } => {
                if sizes.is_uniform() {
                    TAG_GET_REGS
                } else {
                    TAG_GET_REGS_VAR
                }
            }
            Request::SetRegs { sizes, .. } => {
                if sizes.is_uniform() {
                    TAG_SET_REGS
                } else {
                    TAG_SET_REGS_VAR
                }
            }
            Request::GetRegsInfos { .. } => TAG_GET_REGS_INFOS,
            Request::FindRegsIds { .. } => TAG_FIND_REGS_IDS,
            Request::ReadMem { sizes, .. } => {
                if sizes.is_uniform() {
                    TAG_READ_MEM
                } else {
                    TAG_READ_MEM_VAR
                }
            }
            Request::WriteMem { sizes, .. } => {
                if sizes.is_uniform() {
                    TAG_WRITE_MEM
                } else {
                    TAG_WRITE_MEM_VAR
                }
            }
            Request::GetSymsByIds { .. } => TAG_GET_SYMS_BY_IDS,
            Request::GetSymsByAddr { .. } => TAG_GET_SYMS_BY_ADDR,
            Request::GetSymsByNames { .. } => TAG_GET_SYMS_BY_NAMES,
            Request::GetCodeText { .. } => TAG_GET_CODE_TEXT,
            Request::AddBkps { .. } => TAG_ADD_BKPS,
            Request::DelBkps { .. } => TAG_DEL_BKPS,
            Request::Resume { .. } => TAG_RESUME,
        }
    }

    /// client-encode: serialize inputs, skip outputs.
    pub fn encode(&self) -> Vec<u8> {
        let mut e = Encoder::new();
        e.write_i8(self.tag());
        encode_body(self, &mut e);
        e.into_bytes()
    }

    /// server-decode: read the tag-specific body from `bytes` (tag already
    /// consumed by the caller).
    pub fn decode_body(tag: i8, bytes: &[u8]) -> Result<Self> {
        let mut d = Decoder::new(bytes);
        decode_body(tag, &mut d)
    }
}

fn encode_body(req: &Request, e: &mut Encoder) {
    match req {
        Request::Connect | Request::Stop | Request::CheckStopped => {}
        Request::GetRegs { ids, sizes } => {
            let ids: Vec<u64> = ids.iter().map(|&v| v as u64).collect();
            encode_vec_request(e, &ids, sizes, None)
        }
        Request::SetRegs { ids, sizes, values } => {
            let ids: Vec<u64> = ids.iter().map(|&v| v as u64).collect();
            encode_vec_request(e, &ids, sizes, Some(values))
        }
        Request::GetRegsInfos { ids } => {
            e.write_seq(ids, |e, v| e.write_u32(*v));
        }
        Request::FindRegsIds { names } => {
            e.write_seq(names, |e, v| e.write_string(v));
        }
        Request::ReadMem { addrs, sizes } => encode_vec_request(e, addrs, sizes, None),
        Request::WriteMem {
            addrs,
            sizes,
            values,
        } => encode_vec_request(e, addrs, sizes, Some(values)),
        Request::GetSymsByIds { ids } => {
            e.write_seq(ids, |e, v| e.write_u32(*v));
        }
        Request::GetSymsByAddr { addr, size } => {
            e.write_u64(*addr);
            e.write_u64(*size);
        }
        Request::GetSymsByNames { names } => {
            e.write_seq(names, |e, v| e.write_string(v));
        }
        Request::GetCodeText { addr, nins } => {
            e.write_u64(*addr);
            e.write_u64(*nins);
        }
        Request::AddBkps { addrs } | Request::DelBkps { addrs } => {
            e.write_seq(addrs, |e, v| e.write_u64(*v));
        }
        Request::Resume { ty } => e.write_i8(ty.to_wire()),
    }
}

/// Encodes the shared shape of the uniform/variable vector requests:
/// `n, [size], ids[n], [sizes[n]], [values]`.
fn encode_vec_request(e: &mut Encoder, ids: &[u64], sizes: &Sizes, values: Option<&[Vec<u8>]>) {
    e.write_u64(ids.len() as u64);
    match sizes {
        Sizes::Uniform(s) => {
            e.write_u64(*s);
            for id in ids {
                e.write_u64(*id);
            }
        }
        Sizes::Variable(v) => {
            for id in ids {
                e.write_u64(*id);
            }
            for s in v {
                e.write_u64(*s);
            }
        }
    }
    if let Some(values) = values {
        write_values(e, values);
    }
}

fn decode_vec_request(
    d: &mut Decoder<'_>,
    uniform: bool,
    with_values: bool,
) -> Result<(Vec<u64>, Sizes, Vec<Vec<u8>>)> {
    let n = d.read_u64()? as usize;
    let (ids, sizes) = if uniform {
        let size = d.read_u64()?;
        let mut ids = Vec::with_capacity(n);
        for _ in 0..n {
            ids.push(d.read_u64()?);
        }
        (ids, Sizes::Uniform(size))
    } else {
        let mut ids = Vec::with_capacity(n);
        for _ in 0..n {
            ids.push(d.read_u64()?);
        }
        let mut sizes = Vec::with_capacity(n);
        for _ in 0..n {
            sizes.push(d.read_u64()?);
        }
        (ids, Sizes::Variable(sizes))
    };
    let values = if with_values {
        read_values(d, &sizes.expand(n))?
    } else {
        Vec::new()
    };
    Ok((ids, sizes, values))
}

fn decode_body(tag: i8, d: &mut Decoder<'_>) -> Result<Request> {
    Ok(match tag {
        TAG_CONNECT => Request::Connect,
        TAG_STOP => Request::Stop,
        TAG_CHECK_STOPPED => Request::CheckStopped,
        TAG_GET_REGS | TAG_GET_REGS_VAR => {
            let (ids, sizes, _) = decode_vec_request(d, tag == TAG_GET_REGS, false)?;
            Request::GetRegs {
                ids: ids.into_iter().map(|v| v as RegId).collect(),
                sizes,
            }
        }
        TAG_SET_REGS | TAG_SET_REGS_VAR => {
            let (ids, sizes, values) = decode_vec_request(d, tag == TAG_SET_REGS, true)?;
            Request::SetRegs {
                ids: ids.into_iter().map(|v| v as RegId).collect(),
                sizes,
                values,
            }
        }
        TAG_GET_REGS_INFOS => Request::GetRegsInfos {
            ids: d.read_seq(|d| d.read_u32())?,
        },
        TAG_FIND_REGS_IDS => Request::FindRegsIds {
            names: d.read_seq(|d| d.read_string())?,
        },
        TAG_READ_MEM | TAG_READ_MEM_VAR => {
            let (addrs, sizes, _) = decode_vec_request(d, tag == TAG_READ_MEM, false)?;
            Request::ReadMem { addrs, sizes }
        }
        TAG_WRITE_MEM | TAG_WRITE_MEM_VAR => {
            let (addrs, sizes, values) = decode_vec_request(d, tag == TAG_WRITE_MEM, true)?;
            Request::WriteMem {
                addrs,
                sizes,
                values,
            }
        }
        TAG_GET_SYMS_BY_IDS => Request::GetSymsByIds {
            ids: d.read_seq(|d| d.read_u32())?,
        },
        TAG_GET_SYMS_BY_ADDR => Request::GetSymsByAddr {
            addr: d.read_u64()?,
            size: d.read_u64()?,
        },
        TAG_GET_SYMS_BY_NAMES => Request::GetSymsByNames {
            names: d.read_seq(|d| d.read_string())?,
        },
        TAG_GET_CODE_TEXT => Request::GetCodeText {
            addr: d.read_u64()?,
            nins: d.read_u64()?,
        },
        TAG_ADD_BKPS => Request::AddBkps {
            addrs: d.read_seq(|d| d.read_u64())?,
        },
        TAG_DEL_BKPS => Request::DelBkps {
            addrs: d.read_seq(|d| d.read_u64())?,
        },
        TAG_RESUME => Request::Resume {
            ty: ResumeType::from_wire(d.read_i8()?)?,
        },
        other => return Err(Error::Codec(format!("unknown request tag {other}"))),
    })
}

/// A response as sent by the server, with outputs filled.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Connect {
        vm_infos: VmInfos,
        update: StoppedUpdate,
    },
    Stop,
    CheckStopped {
        update: StoppedUpdate,
    },
    GetRegs {
        values: Vec<Vec<u8>>,
    },
    SetRegs,
    GetRegsInfos {
        infos: Vec<RegInfos>,
    },
    FindRegsIds {
        ids: Vec<RegId>,
    },
    ReadMem {
        values: Vec<Vec<u8>>,
    },
    WriteMem,
    GetSymsByIds {
        infos: Vec<SymbolInfos>,
    },
    GetSymsByAddr {
        infos: Vec<SymbolInfos>,
    },
    GetSymsByNames {
        infos: Vec<SymbolInfos>,
    },
    GetCodeText {
        texts: Vec<String>,
        sizes: Vec<Size>,
    },
    AddBkps,
    DelBkps,
    Resume,
    Err {
        message: String,
    },
}

impl Response {
    /// server-encode: serialize outputs for `req`'s tag (uniform/variable
    /// choice is carried by the request, not re-derived from the response).
    pub fn encode(&self, req_tag: i8) -> Vec<u8> {
        let mut e = Encoder::new();
        let tag = match self {
            Response::Err { .. } => TAG_ERR,
            _ => req_tag,
        };
        e.write_i8(tag);
        match self {
            Response::Connect { vm_infos, update } => {
                write_vm_infos(&mut e, vm_infos);
                write_stopped_update(&mut e, update);
            }
            Response::Stop | Response::SetRegs | Response::WriteMem => {}
            Response::CheckStopped { update } => write_stopped_update(&mut e, update),
            Response::GetRegs { values } | Response::ReadMem { values } => {
                write_values(&mut e, values)
            }
            Response::GetRegsInfos { infos } => write_reg_infos(&mut e, infos),
            Response::FindRegsIds { ids } => {
                for id in ids {
                    e.write_u32(*id);
                }
            }
            Response::GetSymsByIds { infos }
            | Response::GetSymsByAddr { infos }
            | Response::GetSymsByNames { infos } => write_symbol_infos(&mut e, infos),
            Response::GetCodeText { texts, sizes } => {
                e.write_seq(texts, |e, v| e.write_string(v));
                e.write_seq(sizes, |e, v| e.write_u64(*v));
            }
            Response::AddBkps | Response::DelBkps | Response::Resume => {}
            Response::Err { message } => e.write_string(message),
        }
        e.into_bytes()
    }

    /// client-decode: read a response body, given the originating request
    /// (needed to size the `GetRegs`/`ReadMem` value arrays) and the tag
    /// actually received (which may be `TAG_ERR`).
    pub fn decode(req: &Request, wire_tag: i8, bytes: &[u8]) -> Result<Self> {
        let mut d = Decoder::new(bytes);
        if wire_tag == TAG_ERR {
            return Ok(Response::Err {
                message: d.read_string()?,
            });
        }
        Ok(match req {
            Request::Connect => Response::Connect {
                vm_infos: read_vm_infos(&mut d)?,
                update: read_stopped_update(&mut d)?,
            },
            Request::Stop => Response::Stop,
            Request::CheckStopped => Response::CheckStopped {
                update: read_stopped_update(&mut d)?,
            },
            Request::GetRegs { ids, sizes } => Response::GetRegs {
                values: read_values(&mut d, &sizes.expand(ids.len()))?,
            },
            Request::SetRegs { .. } => Response::SetRegs,
            Request::GetRegsInfos { .. } => Response::GetRegsInfos {
                infos: read_reg_infos(&mut d)?,
            },
            Request::FindRegsIds { names } => Response::FindRegsIds {
                ids: (0..names.len())
                    .map(|_| d.read_u32())
                    .collect::<Result<_>>()?,
            },
            Request::ReadMem { addrs, sizes } => Response::ReadMem {
                values: read_values(&mut d, &sizes.expand(addrs.len()))?,
            },
            Request::WriteMem { .. } => Response::WriteMem,
            Request::GetSymsByIds { .. }
            | Request::GetSymsByAddr { .. }
            | Request::GetSymsByNames { .. } => {
                let infos = read_symbol_infos(&mut d)?;
                match req {
                    Request::GetSymsByIds { .. } => Response::GetSymsByIds { infos },
                    Request::GetSymsByAddr { .. } => Response::GetSymsByAddr { infos },
                    _ => Response::GetSymsByNames { infos },
                }
            }
            Request::GetCodeText { .. } => {
                let texts = d.read_seq(|d| d.read_string())?;
                let sizes = d.read_seq(|d| d.read_u64())?;
                Response::GetCodeText { texts, sizes }
            }
            Request::AddBkps { .. } => Response::AddBkps,
            Request::DelBkps { .. } => Response::DelBkps,
            Request::Resume { .. } => Response::Resume,
        })
    }
}
