//! Stepping over a call runs the whole subroutine without stopping inside
//! it: repeated `step_over`s land on the instruction after the call, with
//! the call's result already visible and the call stack back to depth one.

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
fn step_over_does_not_stop_inside_the_callee() {
    let mut dbg = Debugger::new(CallingVm::new());
    dbg.on_init();

    let mut reached = dbg.get_execution_point();
    for _ in 0..8 {
        dbg.resume(ResumeType::StepOver).unwrap();
        run_until_stopped(&mut dbg);
        reached = dbg.get_execution_point();
        if reached == support::ADDR_AFTER_CALL {
            break;
        }
        assert_ne!(
            reached,
            support::ADDR_ADD_ENTRY,
            "step_over must never stop inside the callee"
        );
    }

    assert_eq!(reached, support::ADDR_AFTER_CALL);
    assert_eq!(dbg.get_call_stack().len(), 1);
    assert_eq!(
        dbg.get_reg(0).unwrap().val,
        Some(57u64.to_le_bytes().to_vec()),
        "r0 should already hold the callee's result"
    );
}
