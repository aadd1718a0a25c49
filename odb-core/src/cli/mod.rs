//! Token-based command evaluator shared verbatim by the remote `odb-cli`
//! binary and the on-server `mode_server_cli` handler: both drive a
//! [`ClientFacade`], one over TCP, one in-process.

mod lexer;
mod render;

use crate::client::{Backend, ClientFacade};
use crate::types::{RegId, ResumeType, Size, SymId};
use crate::wire::Sizes;
use crate::{Error, Result};

use lexer::{RegRef, SymRef, ValRef, ValueType};

/// Evaluates one command line against `client`, returning the text to print.
/// Errors surface as `Error: <message>` lines rather than propagating, since
/// a bad command should not kill the session.
pub fn evaluate<B: Backend>(line: &str, client: &mut ClientFacade<B>) -> String {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match run(&tokens, client) {
        Ok(out) => out,
        Err(e) => format!("Error: {e}"),
    }
}

fn run<B: Backend>(tokens: &[&str], client: &mut ClientFacade<B>) -> Result<String> {
    let Some((&cmd, args)) = tokens.split_first() else {
        return Ok(String::new());
    };
    match cmd {
        "preg" => cmd_preg(args, client),
        "sreg" => cmd_sreg(args, client),
        "pregi" => cmd_pregi(args, client),
        "pmem" => cmd_pmem(args, client),
        "smem" => cmd_smem(args, client),
        "psym" => cmd_psym(args, client),
        "code" => cmd_code(args, client),
        "b" => cmd_bkpt(args, client, true),
        "delb" => cmd_bkpt(args, client, false),
        "c" | "continue" => cmd_resume(client, ResumeType::Continue),
        "s" | "step" => cmd_resume(client, ResumeType::Step),
        "n" | "next" => cmd_resume(client, ResumeType::StepOver),
        "fin" | "finish" => cmd_resume(client, ResumeType::StepOut),
        "state" => Ok(format!("{:?}", client.state())),
        "bt" => cmd_bt(client),
        "vm" => cmd_vm(client),
        other => Err(Error::precondition(format!("unknown command {other:?}"))),
    }
}

fn ensure_connected<B: Backend>(client: &mut ClientFacade<B>) -> Result<()> {
    use crate::client::ClientState;
    if client.state() == ClientState::NotConnected {
        client.connect()?;
    }
    Ok(())
}

fn parse_type(tok: &str) -> Result<ValueType> {
    ValueType::parse(tok).ok_or_else(|| Error::precondition(format!("unknown type {tok:?}")))
}

fn resolve_reg<B: Backend>(client: &mut ClientFacade<B>, tok: &str) -> Result<RegId> {
    let r = RegRef::parse(tok).ok_or_else(|| Error::precondition(format!("not a register: {tok:?}")))?;
    Ok(match r {
        RegRef::Id(id) => id,
        RegRef::Name(name) => *client
            .find_regs_ids(&[name.clone()])?
            .first()
            .ok_or_else(|| Error::precondition(format!("no such register {name:?}")))?,
    })
}

fn resolve_sym_addr<B: Backend>(client: &mut ClientFacade<B>, sym: &SymRef) -> Result<u64> {
    let infos = match sym {
        SymRef::Id(id) => client.get_syms_by_ids(&[*id as SymId])?,
        SymRef::Name(name) => client.get_syms_by_names(&[name.clone()])?,
    };
    infos
        .first()
        .map(|i| i.addr)
        .ok_or_else(|| Error::precondition("no such symbol".into()))
}

fn resolve_val<B: Backend>(client: &mut ClientFacade<B>, ty: ValueType, v: &ValRef) -> Result<Vec<u8>> {
    match v {
        ValRef::Literal(tok) => {
            ty.encode(tok).ok_or_else(|| Error::precondition(format!("bad {ty:?} literal {tok:?}")))
        }
        ValRef::Symbol(sym) => {
            let addr = resolve_sym_addr(client, sym)?;
            Ok(addr.to_le_bytes()[..ty.byte_size()].to_vec())
        }
    }
}

/// `<addr>` is accepted wherever a `<val>` would be, resolved as a plain
/// `u64`.
fn resolve_addr<B: Backend>(client: &mut ClientFacade<B>, tok: &str) -> Result<u64> {
    match ValRef::parse(tok) {
        ValRef::Symbol(sym) => resolve_sym_addr(client, &sym),
        ValRef::Literal(tok) => {
            ValueType::U64
                .encode(&tok)
                .map(|b| u64::from_le_bytes(b.try_into().unwrap()))
                .ok_or_else(|| Error::precondition(format!("bad address {tok:?}")))
        }
    }
}

fn cmd_preg<B: Backend>(args: &[&str], client: &mut ClientFacade<B>) -> Result<String> {
    ensure_connected(client)?;
    let (&ty_tok, regs) = args
        .split_first()
        .ok_or_else(|| Error::precondition("preg needs a type and at least one register"))?;
    let ty = parse_type(ty_tok)?;
    let ids = regs
        .iter()
        .map(|&t| resolve_reg(client, t))
        .collect::<Result<Vec<_>>>()?;
    let sizes = Sizes::Uniform(ty.byte_size() as Size);
    let values = client.get_regs(&ids, &sizes)?;
    Ok(values
        .iter()
        .map(|v| ty.format(v))
        .collect::<Vec<_>>()
        .join(" "))
}

fn cmd_sreg<B: Backend>(args: &[&str], client: &mut ClientFacade<B>) -> Result<String> {
    ensure_connected(client)?;
    let (&ty_tok, rest) = args
        .split_first()
        .ok_or_else(|| Error::precondition("sreg needs a type and (reg val) pairs"))?;
    let ty = parse_type(ty_tok)?;
    if rest.len() % 2 != 0 {
        return Err(Error::precondition("sreg needs (reg val) pairs"));
    }
    let mut ids = Vec::new();
    let mut values = Vec::new();
    for pair in rest.chunks(2) {
        ids.push(resolve_reg(client, pair[0])?);
        let v = ValRef::parse(pair[1]);
        values.push(resolve_val(client, ty, &v)?);
    }
    let sizes = Sizes::Uniform(ty.byte_size() as Size);
    client.set_regs(&ids, &sizes, values)?;
    Ok(String::new())
}

fn cmd_pregi<B: Backend>(args: &[&str], client: &mut ClientFacade<B>) -> Result<String> {
    ensure_connected(client)?;
    let ids = args
        .iter()
        .map(|&t| resolve_reg(client, t))
        .collect::<Result<Vec<_>>>()?;
    let infos = client.get_regs_infos(&ids)?;
    Ok(infos
        .iter()
        .map(|i| format!("%{} ({}) size={} kind={:?}", i.id, i.name, i.size, i.kind))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn cmd_pmem<B: Backend>(args: &[&str], client: &mut ClientFacade<B>) -> Result<String> {
    ensure_connected(client)?;
    let [ty_tok, addr_tok, count_tok] = args else {
        return Err(Error::precondition("pmem needs <type> <addr> <count>"));
    };
    let ty = parse_type(ty_tok)?;
    let addr = resolve_addr(client, addr_tok)?;
    let count: usize = count_tok
        .parse()
        .map_err(|_| Error::precondition(format!("bad count {count_tok:?}")))?;
    let size = ty.byte_size() as Size;
    let addrs: Vec<u64> = (0..count as u64).map(|i| addr + i * size).collect();
    let values = client.read_mem(&addrs, &Sizes::Uniform(size))?;
    Ok(values
        .iter()
        .map(|v| ty.format(v))
        .collect::<Vec<_>>()
        .join(" "))
}

fn cmd_smem<B: Backend>(args: &[&str], client: &mut ClientFacade<B>) -> Result<String> {
    ensure_connected(client)?;
    let (&ty_tok, rest) = args
        .split_first()
        .ok_or_else(|| Error::precondition("smem needs <type> <addr> <val>+"))?;
    let (&addr_tok, vals) = rest
        .split_first()
        .ok_or_else(|| Error::precondition("smem needs <type> <addr> <val>+"))?;
    let ty = parse_type(ty_tok)?;
    let addr = resolve_addr(client, addr_tok)?;
    let size = ty.byte_size() as Size;
    let addrs: Vec<u64> = (0..vals.len() as u64).map(|i| addr + i * size).collect();
    let values = vals
        .iter()
        .map(|&t| resolve_val(client, ty, &ValRef::parse(t)))
        .collect::<Result<Vec<_>>>()?;
    client.write_mem(&addrs, &Sizes::Uniform(size), values)?;
    Ok(String::new())
}

fn cmd_psym<B: Backend>(args: &[&str], client: &mut ClientFacade<B>) -> Result<String> {
    ensure_connected(client)?;
    let [tok] = args else {
        return Err(Error::precondition("psym needs exactly one symbol"));
    };
    let sym = SymRef::parse(tok).ok_or_else(|| Error::precondition(format!("not a symbol: {tok:?}")))?;
    let infos = match sym {
        SymRef::Id(id) => client.get_syms_by_ids(&[id])?,
        SymRef::Name(name) => client.get_syms_by_names(&[name])?,
    };
    let info = infos
        .first()
        .ok_or_else(|| Error::precondition("no such symbol"))?;
    Ok(format!("@{} ({}) addr={:#x}", info.id, info.name, info.addr))
}

fn cmd_code<B: Backend>(args: &[&str], client: &mut ClientFacade<B>) -> Result<String> {
    ensure_connected(client)?;
    let n: u64 = match args {
        [] => 3,
        [tok] => tok
            .parse()
            .map_err(|_| Error::precondition(format!("bad window size {tok:?}")))?,
        _ => return Err(Error::precondition("code takes at most one argument")),
    };
    let update = client.check_stopped()?;
    let window = n.saturating_mul(2).saturating_add(1);
    let start = update.addr.saturating_sub(n);
    let (texts, _sizes) = client.get_code_text(start, window)?;
    let resolved = render::substitute_symbols(client, &texts)?;
    Ok(resolved.join("\n"))
}

fn cmd_bkpt<B: Backend>(args: &[&str], client: &mut ClientFacade<B>, add: bool) -> Result<String> {
    ensure_connected(client)?;
    let [tok] = args else {
        return Err(Error::precondition("breakpoint commands take exactly one address"));
    };
    let addr = resolve_addr(client, tok)?;
    if add {
        client.add_bkps(&[addr])?;
    } else {
        client.del_bkps(&[addr])?;
    }
    Ok(String::new())
}

fn cmd_resume<B: Backend>(client: &mut ClientFacade<B>, ty: ResumeType) -> Result<String> {
    ensure_connected(client)?;
    client.resume(ty)?;
    Ok(String::new())
}

fn cmd_bt<B: Backend>(client: &mut ClientFacade<B>) -> Result<String> {
    ensure_connected(client)?;
    let update = client.check_stopped()?;
    Ok(update
        .stack
        .iter()
        .rev()
        .map(|f| format!("{:#x} (call site {:#x})", f.caller_start_addr, f.call_addr))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn cmd_vm<B: Backend>(client: &mut ClientFacade<B>) -> Result<String> {
    ensure_connected(client)?;
    let infos = client
        .vm_infos()
        .ok_or_else(|| Error::precondition("vm infos not yet available"))?;
    Ok(format!(
        "{} regs={} mem={} symbols={} pointer_size={} integer_size={}",
        infos.name, infos.regs_count, infos.memory_size, infos.symbols_count, infos.pointer_size, infos.integer_size
    ))
}
