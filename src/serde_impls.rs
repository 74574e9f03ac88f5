//! Serde support for the associative containers (feature `serde`)
//!
//! Unique maps serialize as maps, multi maps as sequences of pairs (formats
//! like JSON cannot express duplicate keys), and sets as sequences.
//! Deserialization rebuilds through the ordinary insert paths, so tree
//! containers come back sorted and multi containers keep duplicate order.

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::compare::Comparator;
use crate::{
    HashMap, HashMultiMap, HashMultiSet, HashSet, TreeMap, TreeMultiMap, TreeMultiSet, TreeSet,
};

macro_rules! serialize_as_map {
    ($ty:ident, $extra:ident: $req:path) => {
        impl<K: Serialize, V: Serialize, $extra: $req> Serialize for $ty<K, V, $extra> {
            fn serialize<Sz: Serializer>(&self, serializer: Sz) -> Result<Sz::Ok, Sz::Error> {
                let mut map = serializer.serialize_map(Some(self.len()))?;
                for (k, v) in self {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    };
}

macro_rules! serialize_as_pair_seq {
    ($ty:ident, $extra:ident: $req:path) => {
        impl<K: Serialize, V: Serialize, $extra: $req> Serialize for $ty<K, V, $extra> {
            fn serialize<Sz: Serializer>(&self, serializer: Sz) -> Result<Sz::Ok, Sz::Error> {
                let mut seq = serializer.serialize_seq(Some(self.len()))?;
                for entry in self {
                    seq.serialize_element(&entry)?;
                }
                seq.end()
            }
        }
    };
}

macro_rules! serialize_as_seq {
    ($ty:ident, $extra:ident: $req:path) => {
        impl<T: Serialize, $extra: $req> Serialize for $ty<T, $extra> {
            fn serialize<Sz: Serializer>(&self, serializer: Sz) -> Result<Sz::Ok, Sz::Error> {
                let mut seq = serializer.serialize_seq(Some(self.len()))?;
                for value in self.iter() {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    };
}

serialize_as_map!(TreeMap, C: Comparator<K>);
serialize_as_map!(HashMap, S: BuildHasher);
serialize_as_pair_seq!(TreeMultiMap, C: Comparator<K>);
serialize_as_pair_seq!(HashMultiMap, S: BuildHasher);
serialize_as_seq!(TreeSet, C: Comparator<T>);
serialize_as_seq!(TreeMultiSet, C: Comparator<T>);
serialize_as_seq!(HashSet, S: BuildHasher);
serialize_as_seq!(HashMultiSet, S: BuildHasher);

struct MapVisitor<M> {
    _marker: PhantomData<M>,
}

struct SeqVisitor<M> {
    _marker: PhantomData<M>,
}

macro_rules! deserialize_map {
    ($ty:ident, [$($kb:tt)+], $bound:ident: $req:path) => {
        impl<'de, K, V, $bound> Deserialize<'de> for $ty<K, V, $bound>
        where
            K: Deserialize<'de> + $($kb)+,
            V: Deserialize<'de>,
            $bound: $req + Default,
        {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_map(MapVisitor::<$ty<K, V, $bound>> { _marker: PhantomData })
            }
        }

        impl<'de, K, V, $bound> Visitor<'de> for MapVisitor<$ty<K, V, $bound>>
        where
            K: Deserialize<'de> + $($kb)+,
            V: Deserialize<'de>,
            $bound: $req + Default,
        {
            type Value = $ty<K, V, $bound>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = Self::Value::default();
                while let Some((key, value)) = access.next_entry()? {
                    out.insert(key, value).map_err(serde::de::Error::custom)?;
                }
                Ok(out)
            }
        }
    };
}

deserialize_map!(TreeMap, [Sized], C: Comparator<K>);
deserialize_map!(HashMap, [Hash + Eq], S: BuildHasher);

macro_rules! deserialize_pair_seq {
    ($ty:ident, [$($kb:tt)+], $bound:ident: $req:path) => {
        impl<'de, K, V, $bound> Deserialize<'de> for $ty<K, V, $bound>
        where
            K: Deserialize<'de> + $($kb)+,
            V: Deserialize<'de>,
            $bound: $req + Default,
        {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_seq(SeqVisitor::<$ty<K, V, $bound>> { _marker: PhantomData })
            }
        }

        impl<'de, K, V, $bound> Visitor<'de> for SeqVisitor<$ty<K, V, $bound>>
        where
            K: Deserialize<'de> + $($kb)+,
            V: Deserialize<'de>,
            $bound: $req + Default,
        {
            type Value = $ty<K, V, $bound>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence of key/value pairs")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = Self::Value::default();
                while let Some((key, value)) = access.next_element::<(K, V)>()? {
                    out.insert(key, value).map_err(serde::de::Error::custom)?;
                }
                Ok(out)
            }
        }
    };
}

deserialize_pair_seq!(TreeMultiMap, [Sized], C: Comparator<K>);
deserialize_pair_seq!(HashMultiMap, [Hash + Eq], S: BuildHasher);

macro_rules! deserialize_value_seq {
    ($ty:ident, [$($tb:tt)+], $bound:ident: $req:path) => {
        impl<'de, T, $bound> Deserialize<'de> for $ty<T, $bound>
        where
            T: Deserialize<'de> + $($tb)+,
            $bound: $req + Default,
        {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_seq(SeqVisitor::<$ty<T, $bound>> { _marker: PhantomData })
            }
        }

        impl<'de, T, $bound> Visitor<'de> for SeqVisitor<$ty<T, $bound>>
        where
            T: Deserialize<'de> + $($tb)+,
            $bound: $req + Default,
        {
            type Value = $ty<T, $bound>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence of values")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = Self::Value::default();
                while let Some(value) = access.next_element::<T>()? {
                    out.insert(value).map_err(serde::de::Error::custom)?;
                }
                Ok(out)
            }
        }
    };
}

deserialize_value_seq!(TreeSet, [Sized], C: Comparator<T>);
deserialize_value_seq!(TreeMultiSet, [Sized], C: Comparator<T>);
deserialize_value_seq!(HashSet, [Hash + Eq], S: BuildHasher);
deserialize_value_seq!(HashMultiSet, [Hash + Eq], S: BuildHasher);

#[cfg(test)]
mod tests {
    use crate::{HashMap, TreeMap, TreeMultiMap, TreeSet};

    #[test]
    fn test_tree_map_round_trip() {
        let map: TreeMap<String, i32> =
            [("b".to_string(), 2), ("a".to_string(), 1)].into_iter().collect();
        let json = serde_json::to_string(&map).unwrap();
        // Serialized in key order.
        assert_eq!(json, r#"{"a":1,"b":2}"#);
        let back: TreeMap<String, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_hash_map_round_trip() {
        let map: HashMap<String, i32> =
            [("x".to_string(), 1), ("y".to_string(), 2)].into_iter().collect();
        let json = serde_json::to_string(&map).unwrap();
        let back: HashMap<String, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_multi_map_keeps_duplicates() {
        let map: TreeMultiMap<i32, i32> = [(1, 10), (1, 11), (2, 20)].into_iter().collect();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, "[[1,10],[1,11],[2,20]]");
        let back: TreeMultiMap<i32, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.count(&1), 2);
        assert_eq!(back, map);
    }

    #[test]
    fn test_set_round_trip() {
        let set: TreeSet<i32> = [3, 1, 2].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "[1,2,3]");
        let back: TreeSet<i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
