//! Property-based tests for URI manipulation functions.
//!
//! These tests use proptest to generate random resource paths and verify
//! that namespace invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::uri::{
        decode_segment, is_collection, is_within, normalize, parent_uri, relativize, resolve,
        SourceMapping,
    };
    use proptest::prelude::*;
    use url::Url;

    fn public_root() -> Url {
        Url::parse("http://example.com/repo/").unwrap()
    }

    fn source_root() -> Url {
        Url::parse("file:///srv/data/").unwrap()
    }

    /// A path segment that is never `.` or `..`.
    fn segment() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_~-][a-zA-Z0-9._~-]{0,7}"
    }

    /// A relative resource path, optionally a collection.
    fn relative_path() -> impl Strategy<Value = String> {
        (prop::collection::vec(segment(), 1..5), any::<bool>()).prop_map(
            |(segments, collection)| {
                let mut path = segments.join("/");
                if collection {
                    path.push('/');
                }
                path
            },
        )
    }

    proptest! {
        /// Property: normalize is idempotent
        #[test]
        fn normalize_is_idempotent(path in relative_path(), escape in "%[0-9a-fA-F]{2}") {
            let uri = Url::parse(&format!("http://example.com/repo/{}{}", path, escape)).unwrap();
            let once = normalize(&uri);
            prop_assert_eq!(normalize(&once), once);
        }

        /// Property: every resolved path lies within the root
        #[test]
        fn resolved_paths_are_within_root(path in relative_path()) {
            let root = public_root();
            let resolved = resolve(&root, &path).unwrap();
            prop_assert!(is_within(&root, &resolved));
            prop_assert_eq!(is_collection(&resolved), path.ends_with('/'));
        }

        /// Property: relativize inverts resolve
        #[test]
        fn relativize_inverts_resolve(path in relative_path()) {
            let root = public_root();
            let resolved = resolve(&root, &path).unwrap();
            let relative = relativize(&root, &resolved).unwrap();
            prop_assert_eq!(resolve(&root, &relative).unwrap(), resolved);
        }

        /// Property: translating to the source namespace and back is lossless
        #[test]
        fn source_mapping_round_trips(path in relative_path()) {
            let mapping = SourceMapping::new(public_root(), source_root()).unwrap();
            let public = resolve(&public_root(), &path).unwrap();
            let source = mapping.to_source(&public).unwrap();
            prop_assert!(is_within(&source_root(), &source));
            prop_assert_eq!(mapping.to_public(&source).unwrap(), public);
        }

        /// Property: the parent of a resource is a collection containing it
        #[test]
        fn parent_is_enclosing_collection(path in relative_path()) {
            let root = public_root();
            let resolved = resolve(&root, &path).unwrap();
            let parent = parent_uri(&root, &resolved).unwrap();
            prop_assert!(is_collection(&parent));
            prop_assert!(is_within(&root, &parent));
            prop_assert!(is_within(&parent, &resolved));
            prop_assert_ne!(parent, resolved);
        }

        /// Property: the root has no parent
        #[test]
        fn root_has_no_parent(_seed in any::<u8>()) {
            let root = public_root();
            prop_assert!(parent_uri(&root, &root).is_none());
        }

        /// Property: decoding leaves unescaped segments unchanged
        #[test]
        fn decode_segment_preserves_plain_segments(input in "[a-zA-Z0-9._~-]*") {
            prop_assert_eq!(decode_segment(&input), input);
        }
    }
}
