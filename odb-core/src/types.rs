//! Plain data types shared by the debugger core, the wire codec and both
//! client and server. Register/symbol/address widths are fixed on the wire
//! regardless of the host VM's native pointer size.

/// Register id, as exposed by the VM adapter and carried on the wire.
pub type RegId = u32;
/// Memory address.
pub type Addr = u64;
/// Byte size / count.
pub type Size = u64;
/// Symbol id.
pub type SymId = u32;

/// Sentinel meaning "no symbol", the all-ones `SymId`.
pub const SYM_ID_NONE: SymId = SymId::MAX;

/// Default window, in address units, that a single symbol preload expands
/// to cover. Overridable per `Debugger` (see [`crate::debugger::Debugger::with_preload_window`]).
pub const DEFAULT_SYMBOL_PRELOAD_WINDOW: u64 = 256;

/// Default TCP listen port for the server transport.
pub const DEFAULT_TCP_PORT: u16 = 12644;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegKind {
    General,
    ProgramCounter,
    StackPointer,
    BasePointer,
    Flags,
}

impl RegKind {
    pub fn to_wire(self) -> i8 {
        match self {
            RegKind::General => 0,
            RegKind::ProgramCounter => 1,
            RegKind::StackPointer => 2,
            RegKind::BasePointer => 3,
            RegKind::Flags => 4,
        }
    }

    pub fn from_wire(v: i8) -> crate::Result<Self> {
        Ok(match v {
            0 => RegKind::General,
            1 => RegKind::ProgramCounter,
            2 => RegKind::StackPointer,
            3 => RegKind::BasePointer,
            4 => RegKind::Flags,
            other => {
                return Err(crate::Error::Codec(format!("invalid RegKind tag {other}")));
            }
        })
    }
}

/// Immutable-over-a-run register metadata, plus an optional transient value
/// snapshot (valid only until the next resume).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegInfos {
    pub id: RegId,
    pub name: String,
    pub size: Size,
    pub kind: RegKind,
    pub val: Option<Vec<u8>>,
}

/// Immutable-per-run symbol metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfos {
    pub id: SymId,
    pub name: String,
    pub addr: Addr,
}

/// Immutable-per-run facts about the host VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmInfos {
    pub name: String,
    pub regs_count: RegId,
    pub regs_general: Vec<RegId>,
    pub regs_program_counter: Vec<RegId>,
    pub regs_stack_pointer: Vec<RegId>,
    pub regs_base_pointer: Vec<RegId>,
    pub regs_flags: Vec<RegId>,
    pub memory_size: Size,
    pub symbols_count: SymId,
    pub pointer_size: Size,
    pub integer_size: Size,
    pub use_opcode: bool,
}

impl VmInfos {
    pub fn regs_of_kind(&self, kind: RegKind) -> &[RegId] {
        match kind {
            RegKind::General => &self.regs_general,
            RegKind::ProgramCounter => &self.regs_program_counter,
            RegKind::StackPointer => &self.regs_stack_pointer,
            RegKind::BasePointer => &self.regs_base_pointer,
            RegKind::Flags => &self.regs_flags,
        }
    }
}

/// One entry in the debugger's call stack: the entry address of the
/// subroutine currently executing, and (for non-top frames) the call site
/// inside it that led to the frame above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallFrame {
    pub caller_start_addr: Addr,
    pub call_addr: Addr,
}

pub type CallStack = Vec<CallFrame>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoppedState {
    Ready,
    Exit,
    Error,
}

impl StoppedState {
    pub fn to_wire(self) -> i8 {
        match self {
            StoppedState::Ready => 0,
            StoppedState::Exit => 1,
            StoppedState::Error => 2,
        }
    }

    pub fn from_wire(v: i8) -> crate::Result<Self> {
        Ok(match v {
            0 => StoppedState::Ready,
            1 => StoppedState::Exit,
            2 => StoppedState::Error,
            other => {
                return Err(crate::Error::Codec(format!(
                    "invalid StoppedState tag {other}"
                )));
            }
        })
    }
}

/// Sent client-ward on every stop: a snapshot of where execution paused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoppedUpdate {
    pub vm_state: StoppedState,
    pub stopped: bool,
    pub addr: Addr,
    pub stack: CallStack,
}

/// The kind of run requested by a `resume` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeType {
    ToFinish,
    Continue,
    Step,
    StepOver,
    StepOut,
}

impl ResumeType {
    pub fn to_wire(self) -> i8 {
        match self {
            ResumeType::ToFinish => 0,
            ResumeType::Continue => 1,
            ResumeType::Step => 2,
            ResumeType::StepOver => 3,
            ResumeType::StepOut => 4,
        }
    }

    pub fn from_wire(v: i8) -> crate::Result<Self> {
        Ok(match v {
            0 => ResumeType::ToFinish,
            1 => ResumeType::Continue,
            2 => ResumeType::Step,
            3 => ResumeType::StepOver,
            4 => ResumeType::StepOut,
            other => {
                return Err(crate::Error::Codec(format!(
                    "invalid ResumeType tag {other}"
                )));
            }
        })
    }
}
