use rustc_hash::FxHashMap;

pub type FastHashMap<K, V> = FxHashMap<K, V>;
