use super::*;

#[test]
fn add_assigns_palette_color_and_trims_name() {
    let registry = Registry::new();
    let id = Uuid::new_v4();

    let peer = registry.add(id, "  Alice ").expect("add");

    assert_eq!(peer.id, id);
    assert_eq!(peer.name, "Alice");
    assert!(PEER_PALETTE.contains(&peer.color.as_str()));
    assert!(peer.active);
    assert!(peer.joined_at > 0);
    assert_eq!(registry.get(id), Some(peer));
}

#[test]
fn blank_name_is_rejected_without_mutation() {
    let registry = Registry::new();
    assert_eq!(registry.add(Uuid::new_v4(), "   "), Err(RegistryError::BlankName));
    assert_eq!(registry.add(Uuid::new_v4(), ""), Err(RegistryError::BlankName));
    assert_eq!(registry.count(), 0);
}

#[test]
fn duplicate_id_is_rejected_and_keeps_original() {
    let registry = Registry::new();
    let id = Uuid::new_v4();
    let first = registry.add(id, "Alice").expect("add");

    assert_eq!(registry.add(id, "Mallory"), Err(RegistryError::DuplicateId(id)));
    assert_eq!(registry.get(id), Some(first));
    assert_eq!(registry.count(), 1);
}

#[test]
fn count_tracks_joins_and_leaves() {
    let registry = Registry::new();
    let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();

    for (n, id) in ids.iter().enumerate() {
        registry.add(*id, &format!("peer-{n}")).expect("add");
        assert_eq!(registry.count(), n + 1);
    }

    let removed = registry.remove(ids[2]).expect("registered");
    assert!(!removed.active);
    assert_eq!(registry.count(), 4);
    assert!(registry.remove(ids[2]).is_none());
    assert_eq!(registry.count(), 4);
    assert!(registry.get(ids[2]).is_none());
}

#[test]
fn list_active_is_in_join_order() {
    let registry = Registry::new();
    let names = ["Alice", "Bob", "Carol", "Dave"];
    for name in names {
        registry.add(Uuid::new_v4(), name).expect("add");
    }

    let listed: Vec<String> = registry.list_active().into_iter().map(|p| p.name).collect();
    assert_eq!(listed, names);
}

#[test]
fn re_join_after_remove_is_a_fresh_peer() {
    let registry = Registry::new();
    let id = Uuid::new_v4();
    registry.add(id, "Alice").expect("add");
    registry.remove(id);

    let again = registry.add(id, "Alice2").expect("re-add");
    assert_eq!(again.name, "Alice2");
    assert_eq!(registry.count(), 1);
}

#[test]
fn concurrent_adds_are_all_counted() {
    let registry = Registry::new();
    let handles: Vec<_> = (0..8)
        .map(|n| {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for m in 0..25 {
                    registry.add(Uuid::new_v4(), &format!("t{n}-{m}")).expect("add");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread");
    }
    assert_eq!(registry.count(), 200);
    assert_eq!(registry.list_active().len(), 200);
}
