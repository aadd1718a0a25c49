//! The capability set a host VM must expose for the debugger to drive it.
//! Implemented by the embedder, never by this crate.

use crate::types::{Addr, RegId, RegInfos, Size, SymId, SymbolInfos, VmInfos};
use crate::Result;

/// What happened on the instruction the VM just executed, as reported to
/// `on_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Error,
    Exit,
    CallSub,
    RetSub,
    Ok,
}

/// One tick's worth of information from the VM adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateInfos {
    pub state: UpdateState,
    pub act_addr: Addr,
}

/// The interface the debugger core drives; implemented by whatever embeds
/// it. Every method may fail with a recoverable [`crate::Error::VmAdapter`].
pub trait VmAdapter {
    fn get_vm_infos(&self) -> VmInfos;

    /// Queried once per tick, after the VM has executed its next
    /// instruction.
    fn get_update_infos(&self) -> UpdateInfos;

    /// Reads `val_only`-sensitive register info: when `val_only` is true only
    /// the value bytes need to be correct, the rest of `infos` may be
    /// reused from a previous call.
    fn get_reg(&self, idx: RegId, infos: &mut RegInfos, val_only: bool) -> Result<()>;

    fn set_reg(&mut self, idx: RegId, val: &[u8]) -> Result<()>;

    fn find_reg_id(&self, name: &str) -> Result<RegId>;

    fn read_mem(&self, addr: Addr, out: &mut [u8]) -> Result<()>;

    fn write_mem(&mut self, addr: Addr, data: &[u8]) -> Result<()>;

    /// Symbol ids whose address falls in `[addr, addr + size)`.
    fn get_symbols(&self, addr: Addr, size: Size) -> Result<Vec<SymId>>;

    fn get_symbol_infos(&self, id: SymId, out: &mut SymbolInfos) -> Result<()>;

    fn find_sym_id(&self, name: &str) -> Result<SymId>;

    /// Textual form of the code unit at `addr`, plus the number of address
    /// units it occupies.
    fn get_code_text(&self, addr: Addr) -> Result<(String, Size)>;
}
