//! Global tag synchronisation keyed by CRN.
//!
//! Tag failures never fail the owning operation: callers log them and carry
//! on, so these helpers either return the error for logging or swallow it
//! with a warning.

use crate::api::{ApiError, TagApi, TagKind};

/// Tags to attach and detach to move from one tag list to another.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TagDiff {
    /// Tags present in the new list only.
    pub attach: Vec<String>,
    /// Tags present in the old list only.
    pub detach: Vec<String>,
}

impl TagDiff {
    /// Computes the difference between `old` and `new`, preserving order and
    /// dropping duplicates.
    #[must_use]
    pub fn between(old: &[String], new: &[String]) -> Self {
        Self {
            attach: missing_from(new, old),
            detach: missing_from(old, new),
        }
    }

    /// Returns `true` when nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attach.is_empty() && self.detach.is_empty()
    }
}

fn missing_from(source: &[String], other: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in source {
        if !other.contains(tag) && !out.contains(tag) {
            out.push(tag.clone());
        }
    }
    out
}

/// Appends `env_tags` to `tags`, skipping duplicates.
#[must_use]
pub fn with_env_tags(tags: &[String], env_tags: &[String]) -> Vec<String> {
    let mut merged = tags.to_vec();
    for tag in env_tags {
        if !merged.contains(tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

/// Moves the tags of `kind` on `crn` from `old` to `new`.
///
/// User tags additionally receive `env_tags`. Detaches run before attaches.
///
/// # Errors
///
/// Returns the first failing tagging call.
pub async fn update_tags(
    api: &dyn TagApi,
    crn: &str,
    old: &[String],
    new: &[String],
    kind: TagKind,
    env_tags: &[String],
) -> Result<(), ApiError> {
    let desired = match kind {
        TagKind::User => with_env_tags(new, env_tags),
        TagKind::Access => new.to_vec(),
    };
    let diff = TagDiff::between(old, &desired);
    if !diff.detach.is_empty() {
        tracing::debug!(%crn, %kind, tags = ?diff.detach, "detaching tags");
        api.detach_tags(crn, &diff.detach, kind).await?;
    }
    if !diff.attach.is_empty() {
        tracing::debug!(%crn, %kind, tags = ?diff.attach, "attaching tags");
        api.attach_tags(crn, &diff.attach, kind).await?;
    }
    Ok(())
}

/// Like [`update_tags`], but logs failures instead of returning them.
pub async fn update_tags_or_warn(
    api: &dyn TagApi,
    resource_id: &str,
    crn: &str,
    old: &[String],
    new: &[String],
    kind: TagKind,
    env_tags: &[String],
) {
    if let Err(err) = update_tags(api, crn, old, new, kind, env_tags).await {
        tracing::warn!(
            resource = %resource_id,
            %kind,
            error = %err,
            "failed to update tags"
        );
    }
}

/// Returns the tags of `kind` on `crn`, or an empty list when the lookup
/// fails.
pub async fn read_tags(api: &dyn TagApi, resource_id: &str, crn: &str, kind: TagKind) -> Vec<String> {
    match api.get_tags(crn, kind).await {
        Ok(tags) => tags,
        Err(err) => {
            tracing::warn!(
                resource = %resource_id,
                %kind,
                error = %err,
                "failed to read tags"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeTagApi, TagCall};

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn diff_keeps_order_and_drops_duplicates() {
        let diff = TagDiff::between(&tags(&["a", "b", "b"]), &tags(&["c", "a", "c"]));
        assert_eq!(diff.attach, tags(&["c"]));
        assert_eq!(diff.detach, tags(&["b"]));
    }

    #[test]
    fn env_tags_are_appended_once() {
        assert_eq!(
            with_env_tags(&tags(&["x", "env:dev"]), &tags(&["env:dev", "team:net"])),
            tags(&["x", "env:dev", "team:net"])
        );
    }

    #[tokio::test]
    async fn user_tag_update_includes_env_tags() {
        let api = FakeTagApi::default();
        update_tags(
            &api,
            "crn:acl",
            &tags(&["old"]),
            &tags(&["new"]),
            TagKind::User,
            &tags(&["env:dev"]),
        )
        .await
        .expect("update succeeds");

        assert_eq!(
            api.calls(),
            vec![
                TagCall::Detach {
                    crn: String::from("crn:acl"),
                    tags: tags(&["old"]),
                    kind: TagKind::User,
                },
                TagCall::Attach {
                    crn: String::from("crn:acl"),
                    tags: tags(&["new", "env:dev"]),
                    kind: TagKind::User,
                },
            ]
        );
        assert_eq!(api.tags_of("crn:acl", TagKind::User), tags(&["new", "env:dev"]));
    }

    #[tokio::test]
    async fn access_tags_ignore_env_tags() {
        let api = FakeTagApi::default();
        update_tags(
            &api,
            "crn:acl",
            &[],
            &tags(&["project:blue"]),
            TagKind::Access,
            &tags(&["env:dev"]),
        )
        .await
        .expect("update succeeds");
        assert_eq!(
            api.tags_of("crn:acl", TagKind::Access),
            tags(&["project:blue"])
        );
    }

    #[tokio::test]
    async fn unchanged_tags_make_no_calls() {
        let api = FakeTagApi::default();
        update_tags(&api, "crn:acl", &tags(&["a"]), &tags(&["a"]), TagKind::User, &[])
            .await
            .expect("update succeeds");
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn read_failures_yield_empty_lists() {
        let api = FakeTagApi::default();
        api.fail_all("tagging service down");
        assert!(read_tags(&api, "acl-1", "crn:acl", TagKind::User).await.is_empty());
    }
}
