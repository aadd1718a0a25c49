//! After three single steps from `_start`, execution sits on the first
//! instruction of the called subroutine, with a second call-stack frame
//! recording where it was entered from.

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
fn step_across_call_enters_the_callee_with_two_frames() {
    let mut dbg = Debugger::new(CallingVm::new());
    dbg.on_init();

    for _ in 0..3 {
        dbg.resume(ResumeType::Step).unwrap();
        run_until_stopped(&mut dbg);
    }

    assert_eq!(dbg.get_execution_point(), support::ADDR_ADD_ENTRY);

    let stack = dbg.get_call_stack();
    assert_eq!(stack.len(), 2, "expected a frame for _start and one for my_add");
    assert_eq!(stack[0].call_addr, support::ADDR_CALL);
    assert_eq!(stack[1].caller_start_addr, support::ADDR_ADD_ENTRY);

    assert_eq!(
        dbg.vm().pending_return_addr(),
        Some(support::ADDR_AFTER_CALL),
        "the VM's own return-address stack should hold the instruction after the call"
    );
}
