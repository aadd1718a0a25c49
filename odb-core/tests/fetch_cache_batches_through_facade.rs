//! The client façade's register cache collapses repeated `get_regs_infos`
//! calls into one request per miss, and re-fetches only values (never infos)
//! after a resume/stop round trip. Exercised here through the real façade
//! and dispatch path, not just the cache in isolation.
//!
//! The façade itself can't be held across a VM tick (its in-process backend
//! borrows the debugger for the call), so state and cache are carried across
//! the tick the same way `ServerApp`'s on-server CLI does.

mod support;

use std::collections::HashMap;

use odb_core::client::{Backend, ClientFacade, ClientState, FetchCache, InProcessBackend};
use odb_core::debugger::Debugger;
use odb_core::types::ResumeType;
use odb_core::wire::{Request, Response, Sizes};
use odb_core::Result;

use support::CallingVm;

/// Wraps any [`Backend`], counting how many requests of each wire tag pass
/// through it.
struct CountingBackend<'a, B> {
    inner: B,
    counts: &'a mut HashMap<i8, usize>,
}

impl<'a, B: Backend> Backend for CountingBackend<'a, B> {
    fn call(&mut self, req: Request) -> Result<Response> {
        *self.counts.entry(req.tag()).or_insert(0) += 1;
        self.inner.call(req)
    }
}

#[test]
fn overlapping_reg_lookups_and_post_resume_refetch_are_minimally_batched() {
    let mut dbg = Debugger::new(CallingVm::new());
    dbg.on_init();
    dbg.stop().unwrap();
    dbg.on_update();
    assert!(dbg.state().is_stopped());

    let get_regs_infos_tag = Request::GetRegsInfos { ids: vec![] }.tag();
    let get_regs_tag = Request::GetRegs {
        ids: vec![],
        sizes: Sizes::Uniform(8),
    }
    .tag();

    let mut counts = HashMap::new();
    let mut state = ClientState::NotConnected;
    let mut cache = FetchCache::new();
    let mut vm_infos = None;

    {
        let backend = CountingBackend {
            inner: InProcessBackend::new(&mut dbg),
            counts: &mut counts,
        };
        let mut client = ClientFacade::from_parts(backend, state, cache, vm_infos);
        client.connect().unwrap();

        client.get_regs_infos(&[0, 1]).unwrap();
        client.get_regs_infos(&[1, 2]).unwrap();
        client.get_regs(&[0], &Sizes::Uniform(8)).unwrap();
        client.resume(ResumeType::Step).unwrap();

        let parts = client.into_parts();
        state = parts.0;
        cache = parts.1;
        vm_infos = parts.2;
    }

    assert_eq!(
        counts.get(&get_regs_infos_tag).copied().unwrap_or(0),
        2,
        "second get_regs_infos call should only fetch the miss (id 2)"
    );
    assert_eq!(
        counts.get(&get_regs_tag).copied().unwrap_or(0),
        1,
        "value for id 0 should only be fetched once before the resume"
    );

    // Drive the VM forward to a stop again, then confirm a value re-fetch
    // happens without infos being re-fetched.
    dbg.vm_mut().tick();
    dbg.on_update();
    assert!(dbg.state().is_stopped());

    {
        let backend = CountingBackend {
            inner: InProcessBackend::new(&mut dbg),
            counts: &mut counts,
        };
        let mut client = ClientFacade::from_parts(backend, state, cache, vm_infos);
        client.check_stopped().unwrap();
        client.get_regs(&[0], &Sizes::Uniform(8)).unwrap();
    }

    assert_eq!(
        counts.get(&get_regs_tag).copied().unwrap_or(0),
        2,
        "value must be re-fetched after resume invalidated the cache"
    );
    assert_eq!(
        counts.get(&get_regs_infos_tag).copied().unwrap_or(0),
        2,
        "infos for ids 0/1/2 were already known; resume must not re-fetch them"
    );
}
