//! Toy VM adapters shared by the integration tests in this directory. Kept
//! separate from `odb_core`'s own internal `test_support` module, which is
//! private to the crate's unit tests: [`VmAdapter`] is the public seam real
//! host VMs implement, so an integration test exercises it the same way an
//! embedder would.

#![allow(dead_code)]

use std::net::TcpListener;

use odb_core::types::{Addr, RegId, RegInfos, RegKind, Size, SymId, SymbolInfos, VmInfos};
use odb_core::vm_api::{UpdateInfos, UpdateState, VmAdapter};
use odb_core::{Error, Result};

/// `_start: movi 12,r0 ; movi 45,r1 ; call my_add ; mov r0,r10 ; movi 0,r0 ; sys 0`
/// `my_add: add r0,r1 ; ret`
pub struct CallingVm {
    pub pc: Addr,
    pub regs: [u64; 11],
    mem: Vec<u8>,
    ret_stack: Vec<Addr>,
    last_transition: UpdateState,
}

pub const SYM_START: SymId = 0;
pub const SYM_ADD: SymId = 1;
pub const ADDR_START: Addr = 0;
pub const ADDR_CALL: Addr = 2;
pub const ADDR_AFTER_CALL: Addr = 3;
pub const ADDR_ADD_ENTRY: Addr = 6;
pub const ADDR_RET: Addr = 7;
pub const ADDR_SYS: Addr = 5;
const PROGRAM_LEN: Addr = 8;

impl CallingVm {
    pub fn new() -> Self {
        CallingVm {
            pc: 0,
            regs: [0; 11],
            mem: vec![0; 4096],
            ret_stack: Vec::new(),
            last_transition: UpdateState::Ok,
        }
    }

    /// Executes the instruction at `pc`. Call once, then ask the debugger to
    /// `on_update()` before ticking again.
    pub fn tick(&mut self) {
        self.last_transition = UpdateState::Ok;
        match self.pc {
            ADDR_START => {
                self.regs[0] = 12;
                self.pc = 1;
            }
            1 => {
                self.regs[1] = 45;
                self.pc = ADDR_CALL;
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
                self.pc = self.ret_stack.pop().expect("ret with no matching call");
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

impl VmAdapter for CallingVm {
    fn get_vm_infos(&self) -> VmInfos {
        VmInfos {
            name: "calling-toyvm".into(),
            regs_count: self.regs.len() as RegId,
            regs_general: (0..self.regs.len() as RegId).collect(),
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
        if (addr..addr + size).contains(&ADDR_START) {
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
                infos.addr = ADDR_START;
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
            ADDR_START => "movi 12,r0",
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

/// A VM that never exits and never calls: one register, a constant address.
/// Used for the networked stop/resume and error-plumbing tests, where the
/// only thing that matters is that it keeps running until told to stop.
pub struct IdleVm {
    pub counter: u64,
}

impl IdleVm {
    pub fn new() -> Self {
        IdleVm { counter: 0 }
    }
}

impl VmAdapter for IdleVm {
    fn get_vm_infos(&self) -> VmInfos {
        VmInfos {
            name: "idle-toyvm".into(),
            regs_count: 1,
            regs_general: vec![0],
            regs_program_counter: vec![],
            regs_stack_pointer: vec![],
            regs_base_pointer: vec![],
            regs_flags: vec![],
            memory_size: 1024,
            symbols_count: 0,
            pointer_size: 8,
            integer_size: 8,
            use_opcode: false,
        }
    }

    fn get_update_infos(&self) -> UpdateInfos {
        UpdateInfos {
            state: UpdateState::Ok,
            act_addr: 0,
        }
    }

    fn get_reg(&self, id: RegId, infos: &mut RegInfos, val_only: bool) -> Result<()> {
        if id != 0 {
            return Err(Error::vm_adapter(format!("no such register {id}")));
        }
        if !val_only {
            infos.name = "counter".into();
            infos.size = 8;
            infos.kind = RegKind::General;
        }
        infos.val = Some(self.counter.to_le_bytes().to_vec());
        Ok(())
    }

    fn set_reg(&mut self, id: RegId, val: &[u8]) -> Result<()> {
        if id != 0 {
            return Err(Error::vm_adapter(format!("no such register {id}")));
        }
        let mut buf = [0u8; 8];
        buf[..val.len().min(8)].copy_from_slice(&val[..val.len().min(8)]);
        self.counter = u64::from_le_bytes(buf);
        Ok(())
    }

    fn find_reg_id(&self, name: &str) -> Result<RegId> {
        if name == "counter" {
            Ok(0)
        } else {
            Err(Error::vm_adapter(format!("no such register {name:?}")))
        }
    }

    fn read_mem(&self, _addr: Addr, out: &mut [u8]) -> Result<()> {
        out.fill(0);
        Ok(())
    }

    fn write_mem(&mut self, _addr: Addr, _data: &[u8]) -> Result<()> {
        Ok(())
    }

    fn get_symbols(&self, _addr: Addr, _size: Size) -> Result<Vec<SymId>> {
        Ok(vec![])
    }

    fn get_symbol_infos(&self, id: SymId, _infos: &mut SymbolInfos) -> Result<()> {
        Err(Error::vm_adapter(format!("no such symbol {id}")))
    }

    fn find_sym_id(&self, name: &str) -> Result<SymId> {
        Err(Error::vm_adapter(format!("no such symbol {name:?}")))
    }

    fn get_code_text(&self, _addr: Addr) -> Result<(String, Size)> {
        Ok(("nop".to_string(), 1))
    }
}

/// Finds a currently-free TCP port by binding to port 0 and releasing it.
/// Small race window between release and reuse; acceptable for a
/// single-machine test suite that does not run this scenario concurrently
/// with itself.
pub fn free_tcp_port() -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral port");
    listener.local_addr().expect("local_addr").port()
}
