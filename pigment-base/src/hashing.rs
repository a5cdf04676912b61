/// Default hashmap for pigment. Keys are URLs we produce ourselves, so the cheaper non-DoS-resistant
/// hash is fine.
pub type HashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;
/// Default hashset for pigment.
pub type HashSet<T> = std::collections::HashSet<T, ahash::RandomState>;
