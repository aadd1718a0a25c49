//! Turns one decoded [`Request`] into a [`Response`] against a live
//! [`Debugger`]. Shared by the TCP server loop and any in-process backend, so
//! both obey the same running/stopped acceptance rule.

use crate::debugger::Debugger;
use crate::types::ResumeType;
use crate::vm_api::VmAdapter;
use crate::wire::{Request, Response, Sizes};
use crate::Result;

/// Runs `req` against `debugger`, routing to the stopped- or
/// running-dispatcher depending on current state. Never returns `Err`: any
/// failure becomes `Response::Err`.
pub fn dispatch<V: VmAdapter>(debugger: &mut Debugger<V>, req: Request) -> Response {
    if debugger.state().is_stopped() {
        dispatch_stopped(debugger, req)
    } else {
        dispatch_running(debugger, req)
    }
}

/// While the VM is running, only `stop` and `check_stopped` make sense:
/// everything else would race the instruction hook.
fn dispatch_running<V: VmAdapter>(debugger: &mut Debugger<V>, req: Request) -> Response {
    match req {
        Request::Stop => to_response(debugger.stop().map(|()| Response::Stop)),
        Request::CheckStopped => Response::CheckStopped {
            update: debugger.stopped_update(),
        },
        other => Response::Err {
            message: format!(
                "vm is running; only stop/check_stopped are accepted (got tag {})",
                other.tag()
            ),
        },
    }
}

fn dispatch_stopped<V: VmAdapter>(debugger: &mut Debugger<V>, req: Request) -> Response {
    match req {
        Request::Connect => to_response(Ok(Response::Connect {
            vm_infos: debugger.get_vm_infos().clone(),
            update: debugger.stopped_update(),
        })),
        Request::Stop => Response::Err {
            message: "debugger is already stopped".into(),
        },
        Request::CheckStopped => Response::CheckStopped {
            update: debugger.stopped_update(),
        },
        Request::GetRegs { ids, sizes } => to_response(get_regs(debugger, &ids, &sizes)),
        Request::SetRegs { ids, values, .. } => to_response(set_regs(debugger, &ids, &values)),
        Request::GetRegsInfos { ids } => to_response(get_regs_infos(debugger, &ids)),
        Request::FindRegsIds { names } => to_response(find_regs_ids(debugger, &names)),
        Request::ReadMem { addrs, sizes } => to_response(read_mem(debugger, &addrs, &sizes)),
        Request::WriteMem { addrs, values, .. } => {
            to_response(write_mem(debugger, &addrs, &values))
        }
        Request::GetSymsByIds { ids } => to_response(get_syms_by_ids(debugger, &ids)),
        Request::GetSymsByAddr { addr, size } => {
            to_response(debugger.get_symbols(addr, size).map(|infos| Response::GetSymsByAddr { infos }))
        }
        Request::GetSymsByNames { names } => to_response(get_syms_by_names(debugger, &names)),
        Request::GetCodeText { addr, nins } => to_response(get_code_text(debugger, addr, nins)),
        Request::AddBkps { addrs } => to_response(add_bkps(debugger, &addrs)),
        Request::DelBkps { addrs } => to_response(del_bkps(debugger, &addrs)),
        Request::Resume { ty } => to_response(resume(debugger, ty)),
    }
}

fn to_response(r: Result<Response>) -> Response {
    match r {
        Ok(resp) => resp,
        Err(e) => Response::Err {
            message: e.to_string(),
        },
    }
}

fn get_regs<V: VmAdapter>(debugger: &mut Debugger<V>, ids: &[crate::types::RegId], sizes: &Sizes) -> Result<Response> {
    let full_sizes = sizes.expand(ids.len());
    let mut values = Vec::with_capacity(ids.len());
    for (&id, &size) in ids.iter().zip(full_sizes.iter()) {
        let info = debugger.get_reg(id)?;
        let val = info.val.unwrap_or_default();
        let n = (size as usize).min(val.len());
        values.push(val[..n].to_vec());
    }
    Ok(Response::GetRegs { values })
}

fn set_regs<V: VmAdapter>(debugger: &mut Debugger<V>, ids: &[crate::types::RegId], values: &[Vec<u8>]) -> Result<Response> {
    for (&id, val) in ids.iter().zip(values.iter()) {
        debugger.set_reg(id, val)?;
    }
    Ok(Response::SetRegs)
}

fn get_regs_infos<V: VmAdapter>(debugger: &mut Debugger<V>, ids: &[crate::types::RegId]) -> Result<Response> {
    let infos = ids
        .iter()
        .map(|&id| debugger.get_reg_infos(id))
        .collect::<Result<Vec<_>>>()?;
    Ok(Response::GetRegsInfos { infos })
}

fn find_regs_ids<V: VmAdapter>(debugger: &mut Debugger<V>, names: &[String]) -> Result<Response> {
    let ids = names
        .iter()
        .map(|n| debugger.find_reg_id(n))
        .collect::<Result<Vec<_>>>()?;
    Ok(Response::FindRegsIds { ids })
}

fn read_mem<V: VmAdapter>(debugger: &Debugger<V>, addrs: &[crate::types::Addr], sizes: &Sizes) -> Result<Response> {
    let full_sizes = sizes.expand(addrs.len());
    let mut values = Vec::with_capacity(addrs.len());
    for (&addr, &size) in addrs.iter().zip(full_sizes.iter()) {
        let mut buf = vec![0u8; size as usize];
        debugger.read_mem(addr, &mut buf)?;
        values.push(buf);
    }
    Ok(Response::ReadMem { values })
}

fn write_mem<V: VmAdapter>(debugger: &mut Debugger<V>, addrs: &[crate::types::Addr], values: &[Vec<u8>]) -> Result<Response> {
    for (&addr, val) in addrs.iter().zip(values.iter()) {
        debugger.write_mem(addr, val)?;
    }
    Ok(Response::WriteMem)
}

fn get_syms_by_ids<V: VmAdapter>(debugger: &mut Debugger<V>, ids: &[crate::types::SymId]) -> Result<Response> {
    let infos = ids
        .iter()
        .map(|&id| debugger.get_symbol_infos(id))
        .collect::<Result<Vec<_>>>()?;
    Ok(Response::GetSymsByIds { infos })
}

fn get_syms_by_names<V: VmAdapter>(debugger: &mut Debugger<V>, names: &[String]) -> Result<Response> {
    let infos = names
        .iter()
        .map(|n| debugger.find_sym_id(n).and_then(|id| debugger.get_symbol_infos(id)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Response::GetSymsByNames { infos })
}

fn get_code_text<V: VmAdapter>(debugger: &mut Debugger<V>, addr: crate::types::Addr, nins: u64) -> Result<Response> {
    let mut texts = Vec::with_capacity(nins as usize);
    let mut sizes = Vec::with_capacity(nins as usize);
    let mut cur = addr;
    for _ in 0..nins.max(1) {
        let (text, size) = debugger.get_code_text(cur)?;
        cur = cur.saturating_add(size);
        texts.push(text);
        sizes.push(size);
    }
    Ok(Response::GetCodeText { texts, sizes })
}

fn add_bkps<V: VmAdapter>(debugger: &mut Debugger<V>, addrs: &[crate::types::Addr]) -> Result<Response> {
    for &addr in addrs {
        debugger.add_breakpoint(addr)?;
    }
    Ok(Response::AddBkps)
}

fn del_bkps<V: VmAdapter>(debugger: &mut Debugger<V>, addrs: &[crate::types::Addr]) -> Result<Response> {
    for &addr in addrs {
        debugger.del_breakpoint(addr)?;
    }
    Ok(Response::DelBkps)
}

fn resume<V: VmAdapter>(debugger: &mut Debugger<V>, ty: ResumeType) -> Result<Response> {
    debugger.resume(ty)?;
    Ok(Response::Resume)
}
