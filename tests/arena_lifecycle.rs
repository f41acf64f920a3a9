//! Arena reset semantics.
//!
//! These tests call `free_arena()` and therefore run in their own process,
//! away from the library's unit tests. Each test holds `epoch_lock()` while
//! it owns live handles, the same protocol the backends follow.

mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use common::{args, simple_object, write_file};
use object::BinaryFormat;
use parking_lot::Mutex;
use tempfile::TempDir;
use xld::atom::{self, ContentKind, DefinedAtom, Scope};
use xld::mem::{self, SpecificReset};

fn panic_message(err: Box<dyn std::any::Any + Send>) -> String {
    match err.downcast::<String>() {
        Ok(msg) => *msg,
        Err(err) => match err.downcast::<&str>() {
            Ok(msg) => msg.to_string(),
            Err(_) => String::from("<non-string panic>"),
        },
    }
}

#[test]
fn strings_reintern_after_reset() {
    let _epoch = mem::epoch_lock();

    let old = mem::saver().save("lifecycle_anchor");
    assert_eq!(&*mem::saver().get(old), "lifecycle_anchor");

    mem::free_arena();

    assert!(mem::saver().try_get(old).is_none());
    let new = mem::saver().save("lifecycle_anchor");
    assert_ne!(old, new);
    assert!(old.epoch() < new.epoch());
    assert_eq!(&*mem::saver().get(new), "lifecycle_anchor");
    assert_eq!(mem::saver().save("lifecycle_anchor"), new);
}

#[test]
fn stale_lookups_panic() {
    let _epoch = mem::epoch_lock();

    let name = mem::saver().save("lifecycle_stale");
    let bytes = mem::bump().alloc_bytes(b"0123");

    mem::free_arena();

    let err = catch_unwind(AssertUnwindSafe(|| {
        let _ = mem::saver().get(name);
    }))
    .unwrap_err();
    assert!(panic_message(err).contains("stale string reference"));

    let err = catch_unwind(AssertUnwindSafe(|| {
        let _ = mem::bump().get(bytes);
    }))
    .unwrap_err();
    assert!(panic_message(err).contains("stale arena reference"));
}

#[test]
fn bump_allocations_go_stale() {
    let _epoch = mem::epoch_lock();

    let r = mem::bump().alloc_bytes(b"\x7fELF");
    assert_eq!(&*mem::bump().get(r), b"\x7fELF");

    mem::free_arena();

    assert!(mem::bump().try_get(r).is_none());
    assert!(r.epoch() < mem::current_epoch());
}

#[test]
fn specific_allocations_reset_in_lockstep() {
    let _epoch = mem::epoch_lock();

    let before = mem::current_epoch();
    let name = mem::saver().save("lifecycle_atom");
    let old = atom::alloc_defined(DefinedAtom {
        name,
        file: 0,
        scope: Scope::Global,
        content: ContentKind::Code,
        size: 8,
        alignment: 1,
        weak: false,
    });
    assert!(atom::counts().defined >= 1);

    mem::free_arena();

    assert_eq!(mem::current_epoch(), before + 1);
    assert_eq!(atom::counts().total(), 0);
    assert!(atom::try_get_defined(old).is_none());

    // The slab starts over from index zero in the new epoch.
    let name = mem::saver().save("lifecycle_atom");
    let fresh = atom::alloc_defined(DefinedAtom {
        name,
        file: 0,
        scope: Scope::Global,
        content: ContentKind::Code,
        size: 8,
        alignment: 1,
        weak: false,
    });
    assert_eq!(fresh.index(), 0);
    assert_eq!(fresh.epoch(), before + 1);
}

#[test]
fn specifics_reset_in_registration_order() {
    struct RecordingReset {
        label: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    impl SpecificReset for RecordingReset {
        fn reset(&self) {
            self.order.lock().push(self.label);
        }
    }

    let _epoch = mem::epoch_lock();

    let order = Arc::new(Mutex::new(Vec::new()));
    let first: Arc<dyn SpecificReset> = Arc::new(RecordingReset {
        label: "first",
        order: order.clone(),
    });
    let second: Arc<dyn SpecificReset> = Arc::new(RecordingReset {
        label: "second",
        order: order.clone(),
    });
    mem::register_specific(&first);
    mem::register_specific(&second);

    mem::free_arena();
    assert_eq!(*order.lock(), ["first", "second"]);

    // Registration order holds across resets, not just for the first one.
    mem::free_arena();
    assert_eq!(*order.lock(), ["first", "second", "first", "second"]);
}

#[test]
fn links_free_the_arena() {
    let dir = TempDir::new().unwrap();
    let a = write_file(&dir, "a.o", &simple_object(BinaryFormat::Elf, &["alpha"], &[]));
    let out = dir.path().join("out.map");

    let (before, anchor) = {
        let _epoch = mem::epoch_lock();
        (mem::current_epoch(), mem::saver().save("lifecycle_link"))
    };

    let mut diag = Vec::new();
    let ok = xld::elf::link(
        &args(&["-o", out.to_str().unwrap(), a.to_str().unwrap()]),
        false,
        &mut diag,
    );
    assert!(ok, "diagnostics: {}", String::from_utf8_lossy(&diag));

    let _epoch = mem::epoch_lock();
    assert!(mem::current_epoch() > before);
    assert!(mem::saver().try_get(anchor).is_none());
}

#[test]
fn failed_links_still_free_the_arena() {
    let before = {
        let _epoch = mem::epoch_lock();
        mem::current_epoch()
    };

    let mut diag = Vec::new();
    let ok = xld::elf::link(&args(&["lifecycle_missing.o"]), false, &mut diag);
    assert!(!ok);

    let _epoch = mem::epoch_lock();
    assert!(mem::current_epoch() > before);
}
