//! Demonstration of a storage-mirrored value shared by two "tabs"

use std::rc::Rc;
use tincan_hooks::host::MemoryStorage;
use tincan_hooks::{use_local_storage, Owner, StorageError};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    println!("=== Persisted Counter Example ===\n");

    let storage = MemoryStorage::new();
    storage.insert_raw("visits", "41");

    println!("1. Mounting tab A; it hydrates from the stored value");
    let tab_a = Owner::new();
    let visits = tab_a.run(|| use_local_storage(Rc::new(storage.clone()), "visits", 0_u32));
    println!("   visits = {}", visits.get());

    let _watch = visits.value().watch(|v| println!("   [Watch] visits is now {v}"));

    println!("\n2. Incrementing writes through to storage and cookie");
    visits.update(|v| *v += 1).ok();
    println!("   stored = {:?}", storage.raw("visits"));
    println!("   cookie = {:?}", storage.cookie("ls-visits"));

    println!("\n3. Another tab writes the key");
    storage.external_set("visits", "100");

    println!("\n4. A full quota keeps the in-memory value");
    storage.fail_writes(Some(StorageError::QuotaExceeded));
    if let Err(err) = visits.set(101) {
        println!("   set failed: {err}");
    }
    println!("   visits = {}, stored = {:?}", visits.get(), storage.raw("visits"));

    println!("\n5. Unmounting removes the change listener");
    tab_a.dispose();
    println!("   listeners = {}", storage.listener_count());

    println!("\n✓ Example complete!");
}
