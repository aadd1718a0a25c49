//! A tiny in-memory VM used only by this crate's own unit tests. Integration
//! tests under `tests/` define their own, since [`VmAdapter`] is the public
//! seam real host VMs implement.

use std::collections::HashMap;

use crate::types::{
    Addr, RegId, RegInfos, RegKind, Size, SymId, SymbolInfos, VmInfos,
};
use crate::vm_api::{UpdateInfos, UpdateState, VmAdapter};
use crate::{Error, Result};

/// `_start: movi 12,r0 ; movi 45,r1 ; call my_add ; mov r0,r10 ; movi 0,r0 ; sys 0`
/// `my_add: add r0,r1 ; ret`
///
/// One instruction per address unit; ticking advances `pc` by one until the
/// program ends in a `Sys` exit.
pub struct ToyVm {
    pub pc: Addr,
    pub regs: [u64; 11],
    pub mem: Vec<u8>,
    pub ticks: usize,
    ret_stack: Vec<Addr>,
    last_transition: UpdateState,
}

const SYM_START: SymId = 0;
const SYM_ADD: SymId = 1;
const ADDR_CALL: Addr = 2;
const ADDR_AFTER_CALL: Addr = 3;
const ADDR_ADD_ENTRY: Addr = 6;
const ADDR_RET: Addr = 7;
const ADDR_SYS: Addr = 5;
const PROGRAM_LEN: Addr = 8;

impl ToyVm {
    pub fn new() -> Self {
        ToyVm {
            pc: 0,
            regs: [0; 11],
            mem: vec![0; 4096],
            ticks: 0,
            ret_stack: Vec::new(),
            last_transition: UpdateState::Ok,
        }
    }

    /// The address of the call instruction's `ret` target, if a call is
    /// currently pending completion. Used by tests to check the VM-level
    /// return-address stack independently of the debugger's own call stack.
    pub fn pending_return_addr(&self) -> Option<Addr> {
        self.ret_stack.last().copied()
    }

    /// Executes the instruction at `pc`, applying jumps for `call`/`ret` and
    /// recording the transition `get_update_infos` will report next. Call
    /// once per `on_update`.
    pub fn tick(&mut self) {
        self.ticks += 1;
        self.last_transition = UpdateState::Ok;
        match self.pc {
            0 => {
                self.regs[0] = 12;
                self.pc = 1;
            }
            1 => {
                self.regs[1] = 45;
                self.pc = 2;
            }
            ADDR_CALL => {
                self.ret_stack.push(ADDR_AFTER_CALL);
                self.pc = ADDR_ADD_ENTRY;
                self.last_transition = UpdateState::CallSub;
            }
            ADDR_ADD_ENTRY => {
                self.regs[0] += self.regs[1];
                self.pc = ADDR_RET;
            }
            ADDR_RET => {
                self.pc = self
                    .ret_stack
                    .pop()
                    .expect("ret with no matching call in toy program");
                self.last_transition = UpdateState::RetSub;
            }
            ADDR_AFTER_CALL => {
                self.regs[10] = self.regs[0];
                self.pc = 4;
            }
            4 => {
                self.regs[0] = 0;
                self.pc = ADDR_SYS;
            }
            ADDR_SYS => {
                self.last_transition = UpdateState::Exit;
            }
            _ => {}
        }
    }
}

impl VmAdapter for ToyVm {
    fn get_vm_infos(&self) -> VmInfos {
        VmInfos {
            name: "toyvm".into(),
            regs_count: 11,
            regs_general: (0..11).collect(),
            regs_program_counter: vec![],
            regs_stack_pointer: vec![],
            regs_base_pointer: vec![],
            regs_flags: vec![],
            memory_size: self.mem.len() as Size,
            symbols_count: 2,
            pointer_size: 8,
            integer_size: 8,
            use_opcode: false,
        }
    }

    fn get_update_infos(&self) -> UpdateInfos {
        UpdateInfos {
            state: self.last_transition,
            act_addr: self.pc,
        }
    }

    fn get_reg(&self, id: RegId, infos: &mut RegInfos, val_only: bool) -> Result<()> {
        if id as usize >= self.regs.len() {
            return Err(Error::vm_adapter(format!("no such register {id}")));
        }
        if !val_only {
            infos.name = format!("r{id}");
            infos.size = 8;
            infos.kind = RegKind::General;
        }
        infos.val = Some(self.regs[id as usize].to_le_bytes().to_vec());
        Ok(())
    }

    fn set_reg(&mut self, id: RegId, val: &[u8]) -> Result<()> {
        let mut buf = [0u8; 8];
        buf[..val.len().min(8)].copy_from_slice(&val[..val.len().min(8)]);
        self.regs[id as usize] = u64::from_le_bytes(buf);
        Ok(())
    }

    fn find_reg_id(&self, name: &str) -> Result<RegId> {
        name.strip_prefix('r')
            .and_then(|n| n.parse().ok())
            .filter(|&id: &u32| (id as usize) < self.regs.len())
            .ok_or_else(|| Error::vm_adapter(format!("no such register {name:?}")))
    }

    fn read_mem(&self, addr: Addr, out: &mut [u8]) -> Result<()> {
        let start = addr as usize;
        out.copy_from_slice(&self.mem[start..start + out.len()]);
        Ok(())
    }

    fn write_mem(&mut self, addr: Addr, data: &[u8]) -> Result<()> {
        let start = addr as usize;
        self.mem[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn get_symbols(&self, addr: Addr, size: Size) -> Result<Vec<SymId>> {
        let mut out = Vec::new();
        if (addr..addr + size).contains(&0) {
            out.push(SYM_START);
        }
        if (addr..addr + size).contains(&ADDR_ADD_ENTRY) {
            out.push(SYM_ADD);
        }
        Ok(out)
    }

    fn get_symbol_infos(&self, id: SymId, infos: &mut SymbolInfos) -> Result<()> {
        infos.id = id;
        match id {
            SYM_START => {
                infos.name = "_start".into();
                infos.addr = 0;
            }
            SYM_ADD => {
                infos.name = "my_add".into();
                infos.addr = ADDR_ADD_ENTRY;
            }
            _ => return Err(Error::vm_adapter(format!("no such symbol {id}"))),
        }
        Ok(())
    }

    fn find_sym_id(&self, name: &str) -> Result<SymId> {
        match name {
            "_start" => Ok(SYM_START),
            "my_add" => Ok(SYM_ADD),
            _ => Err(Error::vm_adapter(format!("no such symbol {name:?}"))),
        }
    }

    fn get_code_text(&self, addr: Addr) -> Result<(String, Size)> {
        if addr >= PROGRAM_LEN {
            return Err(Error::vm_adapter(format!("no code at {addr:#x}")));
        }
        let text = match addr {
            0 => "movi 12,r0",
            1 => "movi 45,r1",
            ADDR_CALL => "call my_add",
            ADDR_AFTER_CALL => "mov r0,r10",
            4 => "movi 0,r0",
            ADDR_SYS => "sys 0",
            ADDR_ADD_ENTRY => "add r0,r1",
            ADDR_RET => "ret",
            _ => "nop",
        };
        Ok((text.to_string(), 1))
    }
}
