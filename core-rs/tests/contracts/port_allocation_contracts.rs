//! Port allocation contracts
//!
//! Invariants the allocator must hold for parallel fixtures: every
//! allocation is unique while claimed, pinned ports conflict with live
//! claims, and released ports become reusable.

use mysql_fixture::port;
use std::collections::HashSet;
use std::thread;

#[test]
fn contract_allocations_unique_while_claimed() {
    let mut ports = Vec::new();
    for _ in 0..10 {
        ports.push(port::allocate().unwrap());
    }

    let unique: HashSet<u16> = ports.iter().copied().collect();
    assert_eq!(unique.len(), ports.len());

    for p in ports {
        assert!(port::release(p));
    }
}

#[test]
fn contract_concurrent_allocations_never_collide() {
    let handles: Vec<_> = (0..16)
        .map(|_| thread::spawn(|| port::allocate().unwrap()))
        .collect();

    let ports: Vec<u16> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let unique: HashSet<u16> = ports.iter().copied().collect();
    assert_eq!(unique.len(), ports.len(), "Concurrent allocations collided");

    for p in ports {
        port::release(p);
    }
}

#[test]
fn contract_pinned_port_conflicts_with_claim() {
    let p = port::allocate().unwrap();

    assert!(port::claim(p).is_err());

    port::release(p);
    assert!(port::claim(p).is_ok());
    port::release(p);
}

#[test]
fn contract_release_makes_port_reusable() {
    let p = port::allocate().unwrap();
    assert!(port::release(p));

    // A released port is no longer claimed
    assert!(!port::release(p));
    assert!(port::claim(p).is_ok());
    port::release(p);
}

#[test]
fn contract_allocated_port_is_bindable() {
    let p = port::allocate().unwrap();

    // The claim is bookkeeping; the port itself is free for the server
    assert!(port::is_port_available(p));

    port::release(p);
}
