use crate::Interner;

#[test]
fn intern_deduplicates() {
    let mut interner = Interner::new();
    let a = interner.intern("Model");
    let b = interner.intern("Model");
    let c = interner.intern("Greeting");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(interner.len(), 2);
}

#[test]
fn resolve_round_trips() {
    let mut interner = Interner::new();
    let sym = interner.intern("name");
    assert_eq!(interner.resolve(sym), "name");
}

#[test]
fn get_does_not_intern() {
    let mut interner = Interner::new();
    interner.intern("present");
    assert!(interner.get("present").is_some());
    assert!(interner.get("absent").is_none());
    assert_eq!(interner.len(), 1);
}

#[test]
fn symbols_order_by_insertion() {
    let mut interner = Interner::new();
    let first = interner.intern("zebra");
    let second = interner.intern("aardvark");
    assert!(first < second);
}

#[test]
fn rehydrate_restores_lookup() {
    let mut interner = Interner::new();
    let sym = interner.intern("Person");

    let bytes = postcard::to_allocvec(&interner).unwrap();
    let mut restored: Interner = postcard::from_bytes(&bytes).unwrap();
    restored.rehydrate();

    assert_eq!(restored.get("Person"), Some(sym));
    assert_eq!(restored.resolve(sym), "Person");
}
