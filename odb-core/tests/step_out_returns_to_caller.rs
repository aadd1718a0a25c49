//! From a breakpoint inside a callee, `step_out` runs until the matching
//! `ret`, landing on the instruction right after the call site and popping
//! the callee's frame off the call stack.

mod support;

use odb_core::debugger::Debugger;
use odb_core::types::ResumeType;

use support::CallingVm;

fn run_until_stopped(dbg: &mut Debugger<CallingVm>) {
    for _ in 0..64 {
        if dbg.state().is_stopped() {
            return;
        }
        dbg.vm_mut().tick();
        dbg.on_update();
    }
    panic!("program did not stop within 64 ticks");
}

#[test]
fn step_out_lands_after_the_call_site() {
    let mut dbg = Debugger::new(CallingVm::new());
    dbg.on_init();

    dbg.add_breakpoint(support::ADDR_ADD_ENTRY).unwrap();
    dbg.resume(ResumeType::Continue).unwrap();
    run_until_stopped(&mut dbg);
    assert_eq!(dbg.get_execution_point(), support::ADDR_ADD_ENTRY);
    assert_eq!(dbg.get_call_stack().len(), 2);

    dbg.resume(ResumeType::StepOut).unwrap();
    run_until_stopped(&mut dbg);

    assert_eq!(dbg.get_execution_point(), support::ADDR_AFTER_CALL);
    assert_eq!(dbg.get_call_stack().len(), 1);
}
