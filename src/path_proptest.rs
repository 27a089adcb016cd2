//! Property-based tests for naming and path helpers.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::git::is_valid_branch_name;
    use crate::model::{is_valid_commit, is_valid_repo, MigrationDescriptor};
    use crate::path::expand_env_vars;
    use proptest::prelude::*;

    // ============================================================================
    // output folder naming
    // ============================================================================

    proptest! {
        /// Property: a valid descriptor maps to a single path component
        #[test]
        fn folder_name_is_one_component(
            owner in "[A-Za-z0-9_-][A-Za-z0-9._-]{0,15}",
            name in "[A-Za-z0-9_-][A-Za-z0-9._-]{0,15}",
            commit in "[0-9a-f]{4,40}",
        ) {
            let descriptor = MigrationDescriptor::new(&format!("{}/{}", owner, name), &commit);
            prop_assert!(descriptor.validate().is_ok());
            let folder = descriptor.folder_name();
            prop_assert!(!folder.contains('/'));
            let suffix = format!("__{}", commit);
            prop_assert!(folder.ends_with(&suffix));
            prop_assert_eq!(
                std::path::Path::new(&folder).components().count(),
                1
            );
        }

        /// Property: distinct commits of one repo never share a folder
        #[test]
        fn folder_name_distinguishes_commits(
            a in "[0-9a-f]{4,40}",
            b in "[0-9a-f]{4,40}",
        ) {
            prop_assume!(a != b);
            let left = MigrationDescriptor::new("acme/widgets", &a);
            let right = MigrationDescriptor::new("acme/widgets", &b);
            prop_assert_ne!(left.folder_name(), right.folder_name());
        }

        /// Property: anything with a slash beyond owner/name is rejected
        #[test]
        fn repo_with_extra_segments_is_invalid(
            parts in prop::collection::vec("[a-z]{1,8}", 3..6),
        ) {
            prop_assert!(!is_valid_repo(&parts.join("/")));
        }

        /// Property: non-hex characters make a commit id invalid
        #[test]
        fn commit_with_non_hex_is_invalid(
            prefix in "[0-9a-f]{2,10}",
            bad in "[g-zG-Z ]",
            suffix in "[0-9a-f]{2,10}",
        ) {
            let candidate = format!("{}{}{}", prefix, bad, suffix);
            prop_assert!(!is_valid_commit(&candidate));
        }
    }

    // ============================================================================
    // branch names
    // ============================================================================

    proptest! {
        /// Property: plain lowercase words separated by dashes are valid
        #[test]
        fn simple_branch_names_are_valid(name in "[a-z][a-z0-9]{0,10}(-[a-z0-9]{1,6}){0,3}") {
            prop_assert!(is_valid_branch_name(&name), "'{}' should be valid", name);
        }

        /// Property: a forbidden character anywhere makes the name invalid
        #[test]
        fn forbidden_characters_are_rejected(
            head in "[a-z]{1,8}",
            bad in "[ ~^:?*\\[\\\\]",
            tail in "[a-z]{0,8}",
        ) {
            let name = format!("{}{}{}", head, bad, tail);
            prop_assert!(!is_valid_branch_name(&name), "'{}' should be invalid", name);
        }
    }

    // ============================================================================
    // environment expansion
    // ============================================================================

    proptest! {
        /// Property: input without '$' is returned unchanged
        #[test]
        fn expand_without_dollar_is_identity(input in "[^$]*") {
            prop_assert_eq!(expand_env_vars(&input), input);
        }
    }
}
