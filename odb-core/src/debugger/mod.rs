//! The debugger core: per-instruction state machine, breakpoints, call
//! stack, and the register/symbol caches that make repeated VM-adapter
//! queries cheap.

mod state;

pub use state::State;

use std::collections::HashMap;

use log::{debug, trace, warn};

use crate::range_map::RangeMap;
use crate::types::{
    Addr, CallFrame, CallStack, RegId, RegInfos, ResumeType, Size, StoppedState, StoppedUpdate,
    SymId, SymbolInfos, VmInfos, DEFAULT_SYMBOL_PRELOAD_WINDOW,
};
use crate::vm_api::{UpdateState, VmAdapter};
use crate::{Error, Result};

/// Owns a host VM adapter and drives it one instruction at a time.
pub struct Debugger<V> {
    vm: V,
    infos: Option<VmInfos>,
    state: State,
    call_stack: CallStack,
    ins_addr: Addr,
    step_over_depth: Option<usize>,

    map_regs: HashMap<RegId, RegInfos>,
    regs_by_name: HashMap<String, RegId>,

    map_syms: HashMap<SymId, SymbolInfos>,
    syms_by_name: HashMap<String, SymId>,
    syms_ranges: Option<RangeMap<u8>>,

    breakpts: std::collections::BTreeSet<Addr>,
    preload_window: u64,
}

impl<V: VmAdapter> Debugger<V> {
    pub fn new(vm: V) -> Self {
        Debugger {
            vm,
            infos: None,
            state: State::NotStarted,
            call_stack: Vec::new(),
            ins_addr: 0,
            step_over_depth: None,
            map_regs: HashMap::new(),
            regs_by_name: HashMap::new(),
            map_syms: HashMap::new(),
            syms_by_name: HashMap::new(),
            syms_ranges: None,
            breakpts: std::collections::BTreeSet::new(),
            preload_window: DEFAULT_SYMBOL_PRELOAD_WINDOW,
        }
    }

    /// Overrides the symbol preload window (default 256 address units).
    pub fn with_preload_window(mut self, window: u64) -> Self {
        self.preload_window = window;
        self
    }

    pub fn vm(&self) -> &V {
        &self.vm
    }

    pub fn vm_mut(&mut self) -> &mut V {
        &mut self.vm
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn get_vm_infos(&self) -> &VmInfos {
        self.infos.as_ref().expect("on_init must run before use")
    }

    pub fn get_execution_point(&self) -> Addr {
        self.ins_addr
    }

    pub fn get_call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    /// Queries VM infos, allocates the symbol range map, records the initial
    /// call frame and enters `running_tofinish`.
    pub fn on_init(&mut self) {
        let infos = self.vm.get_vm_infos();
        let update = self.vm.get_update_infos();
        self.ins_addr = update.act_addr;
        self.syms_ranges = Some(RangeMap::new(0, infos.memory_size.saturating_sub(1), 0));
        self.call_stack = vec![CallFrame {
            caller_start_addr: self.ins_addr,
            call_addr: 0,
        }];
        self.infos = Some(infos);
        self.state = State::RunningToFinish;
        debug!("debugger initialized at {:#x}", self.ins_addr);
    }

    pub fn stopped_update(&self) -> StoppedUpdate {
        let vm_state = match self.state {
            State::Exit => StoppedState::Exit,
            State::Error => StoppedState::Error,
            _ => StoppedState::Ready,
        };
        StoppedUpdate {
            vm_state,
            stopped: self.state == State::Stopped || self.state == State::Exit
                || self.state == State::Error,
            addr: self.ins_addr,
            stack: self.call_stack.clone(),
        }
    }

    /// Drives one VM instruction's worth of state transition, applying the
    /// stop policy for the current running state.
    pub fn on_update(&mut self) {
        if self.state == State::Exit || self.state == State::Error {
            return;
        }
        let update = self.vm.get_update_infos();
        let call_site = self.ins_addr;
        self.ins_addr = update.act_addr;

        match update.state {
            UpdateState::Error => {
                warn!("vm adapter reported error at {:#x}", self.ins_addr);
                self.state = State::Error;
                return;
            }
            UpdateState::Exit => {
                trace!("vm exited at {:#x}", self.ins_addr);
                self.state = State::Exit;
                return;
            }
            UpdateState::CallSub => {
                if let Some(top) = self.call_stack.last_mut() {
                    top.call_addr = call_site;
                }
                self.call_stack.push(CallFrame {
                    caller_start_addr: self.ins_addr,
                    call_addr: 0,
                });
            }
            UpdateState::RetSub => {
                self.call_stack
                    .pop()
                    .expect("call stack underflow: more returns than calls");
            }
            UpdateState::Ok => {}
        }

        let depth = self.call_stack.len();
        let should_stop = match self.state {
            State::RunningToFinish => false,
            State::RunningStep => true,
            State::RunningStepOver => {
                self.step_over_depth
                    .map(|saved| saved >= depth)
                    .unwrap_or(true)
            }
            State::RunningStepOut => update.state == UpdateState::RetSub,
            State::RunningBkp | State::Stopped | State::NotStarted => false,
            State::Exit | State::Error => false,
        } || self.breakpts.contains(&self.ins_addr);

        if should_stop {
            trace!("stopping at {:#x}", self.ins_addr);
            self.state = State::Stopped;
            self.step_over_depth = None;
        }
    }

    pub fn add_breakpoint(&mut self, addr: Addr) -> Result<()> {
        if addr >= self.get_vm_infos().memory_size {
            return Err(Error::precondition(format!(
                "breakpoint address {addr:#x} out of range"
            )));
        }
        if !self.breakpts.insert(addr) {
            return Err(Error::precondition(format!(
                "breakpoint already set at {addr:#x}"
            )));
        }
        Ok(())
    }

    pub fn has_breakpoint(&self, addr: Addr) -> bool {
        self.breakpts.contains(&addr)
    }

    pub fn del_breakpoint(&mut self, addr: Addr) -> Result<()> {
        if !self.breakpts.remove(&addr) {
            return Err(Error::precondition(format!(
                "no breakpoint set at {addr:#x}"
            )));
        }
        Ok(())
    }

    pub fn resume(&mut self, ty: ResumeType) -> Result<()> {
        if self.state == State::Exit || self.state == State::Error {
            return Err(Error::precondition("cannot resume a terminated VM"));
        }
        self.state = match ty {
            ResumeType::ToFinish => State::RunningToFinish,
            ResumeType::Continue => State::RunningBkp,
            ResumeType::Step => State::RunningStep,
            ResumeType::StepOver => State::RunningStepOver,
            ResumeType::StepOut => State::RunningStepOut,
        };
        self.step_over_depth = if ty == ResumeType::StepOver {
            Some(self.call_stack.len())
        } else {
            None
        };
        Ok(())
    }

    /// Request-to-stop; the actual transition happens on the next
    /// `on_update`.
    pub fn stop(&mut self) -> Result<()> {
        if matches!(self.state, State::Stopped | State::Exit | State::Error) {
            return Err(Error::precondition("debugger is already stopped"));
        }
        self.state = State::RunningStep;
        Ok(())
    }

    /// Forces an immediate transition to `stopped`, bypassing the usual
    /// rule that `stop()` only takes effect on the next `on_update`. Used
    /// only to honor `nostart`, which must stop the VM before its first
    /// instruction runs, not after it.
    pub fn force_stopped(&mut self) {
        self.state = State::Stopped;
        self.step_over_depth = None;
    }

    fn _load_reg(&mut self, id: RegId, val_only: bool) -> Result<()> {
        if val_only || !self.map_regs.contains_key(&id) {
            let mut infos = self.map_regs.get(&id).cloned().unwrap_or(RegInfos {
                id,
                name: String::new(),
                size: 0,
                kind: crate::types::RegKind::General,
                val: None,
            });
            self.vm.get_reg(id, &mut infos, val_only)?;
            if !val_only {
                self.regs_by_name.insert(infos.name.clone(), id);
            }
            self.map_regs.insert(id, infos);
        }
        Ok(())
    }

    /// Always issues a value-only refresh before returning.
    pub fn get_reg(&mut self, id: RegId) -> Result<RegInfos> {
        self._load_reg(id, false)?;
        self._load_reg(id, true)?;
        Ok(self.map_regs.get(&id).expect("just loaded").clone())
    }

    pub fn get_reg_infos(&mut self, id: RegId) -> Result<RegInfos> {
        self._load_reg(id, false)?;
        Ok(self.map_regs.get(&id).expect("just loaded").clone())
    }

    pub fn set_reg(&mut self, id: RegId, val: &[u8]) -> Result<()> {
        self._load_reg(id, false)?;
        self.vm.set_reg(id, val)?;
        if let Some(infos) = self.map_regs.get_mut(&id) {
            infos.val = Some(val.to_vec());
        }
        Ok(())
    }

    pub fn find_reg_id(&mut self, name: &str) -> Result<RegId> {
        if let Some(id) = self.regs_by_name.get(name) {
            return Ok(*id);
        }
        let id = self.vm.find_reg_id(name)?;
        self._load_reg(id, false)?;
        Ok(id)
    }

    pub fn read_mem(&self, addr: Addr, out: &mut [u8]) -> Result<()> {
        self.vm.read_mem(addr, out)
    }

    pub fn write_mem(&mut self, addr: Addr, data: &[u8]) -> Result<()> {
        self.vm.write_mem(addr, data)
    }

    /// Expands `[addr, addr+size)` forward to at least the preload window,
    /// short-circuits via the range map's endpoints when the whole window is
    /// already loaded, else walks the window's segments and queries the VM
    /// only for the sub-ranges not yet marked loaded, caching info for every
    /// id found.
    fn preload_symbols(&mut self, addr: Addr, size: Size) -> Result<()> {
        let max = self.syms_ranges.as_ref().unwrap().max();
        let window = size.max(self.preload_window).max(1);
        let hi = addr.saturating_add(window - 1).min(max);

        let ranges = self.syms_ranges.as_ref().unwrap();
        if ranges.get(addr) == 1 && ranges.get(hi) == 1 {
            return Ok(());
        }

        let mut k = addr;
        loop {
            let (seg_lo, seg_hi, val) = self.syms_ranges.as_ref().unwrap().range_of(k);
            let lo = seg_lo.max(addr);
            let seg_end = seg_hi.min(hi);
            if val == 0 {
                let ids = self.vm.get_symbols(lo, seg_end - lo + 1)?;
                self.syms_ranges.as_mut().unwrap().set(lo, seg_end, 1);
                for id in ids {
                    self.load_symbol(id)?;
                }
            }
            if seg_end >= hi {
                break;
            }
            k = seg_end + 1;
        }
        Ok(())
    }

    /// One-argument form: centers a preload-window-sized range on `addr`.
    fn preload_symbols_at(&mut self, addr: Addr) -> Result<()> {
        let half = self.preload_window / 2;
        let start = addr.saturating_sub(half);
        self.preload_symbols(start, self.preload_window)
    }

    fn load_symbol(&mut self, id: SymId) -> Result<()> {
        if self.map_syms.contains_key(&id) {
            return Ok(());
        }
        let mut infos = SymbolInfos {
            id,
            name: String::new(),
            addr: 0,
        };
        self.vm.get_symbol_infos(id, &mut infos)?;
        self.syms_by_name.insert(infos.name.clone(), id);
        self.map_syms.insert(id, infos);
        Ok(())
    }

    pub fn get_symbols(&mut self, addr: Addr, size: Size) -> Result<Vec<SymbolInfos>> {
        self.preload_symbols(addr, size)?;
        let mut out: Vec<SymbolInfos> = self
            .map_syms
            .values()
            .filter(|s| s.addr >= addr && s.addr < addr + size)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.addr);
        Ok(out)
    }

    pub fn get_symbol_infos(&mut self, id: SymId) -> Result<SymbolInfos> {
        self.load_symbol(id)?;
        self.map_syms
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::vm_adapter(format!("unknown symbol id {id}")))
    }

    pub fn find_sym_id(&mut self, name: &str) -> Result<SymId> {
        if let Some(id) = self.syms_by_name.get(name) {
            return Ok(*id);
        }
        let id = self.vm.find_sym_id(name)?;
        self.load_symbol(id)?;
        Ok(id)
    }

    pub fn get_code_text(&mut self, addr: Addr) -> Result<(String, Size)> {
        self.preload_symbols_at(addr)?;
        self.vm.get_code_text(addr)
    }
}
