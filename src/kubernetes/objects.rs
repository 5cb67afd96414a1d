// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reconciliation primitives over untyped objects.
//!
//! All replication traffic goes through `DynamicObject`, so the building
//! blocks here are sub-tree accessors plus conflict-safe submit loops.

use crate::constants::retry::{INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, UPDATE_ATTEMPTS};
use crate::error::{PeersyncError, Result};
use kube::api::{Api, DeleteParams, DynamicObject, PostParams};
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Get an object, mapping the expected not-found case to `None`.
/// Transport errors still surface as errors.
pub async fn get_opt(api: &Api<DynamicObject>, name: &str) -> Result<Option<DynamicObject>> {
    match api.get(name).await {
        Ok(obj) => Ok(Some(obj)),
        Err(kube::Error::Api(err)) if err.code == 404 => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Named sub-tree (`spec`, `status`, ...) of an untyped object
pub fn subtree<'a>(obj: &'a DynamicObject, key: &str) -> Option<&'a Value> {
    obj.data.get(key)
}

/// Structural equality over one sub-tree of two objects.
/// A sub-tree absent on both sides is equal; absent on one side is not.
pub fn subtree_equal(a: &DynamicObject, b: &DynamicObject, key: &str) -> bool {
    match (subtree(a, key), subtree(b, key)) {
        (None, None) => true,
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Replace one sub-tree of the named object, retrying on resourceVersion
/// conflicts with bounded exponential backoff. Fetches the latest copy on
/// every attempt so concurrent writers only cost a retry.
pub async fn update_subtree(
    api: &Api<DynamicObject>,
    name: &str,
    key: &str,
    value: Option<&Value>,
) -> Result<()> {
    let mut backoff = INITIAL_BACKOFF_MS;

    for attempt in 1..=UPDATE_ATTEMPTS {
        let mut latest = api.get(name).await?;
        set_subtree(&mut latest, key, value)?;

        match api.replace(name, &PostParams::default(), &latest).await {
            Ok(_) => return Ok(()),
            Err(kube::Error::Api(err)) if err.code == 409 => {
                debug!(
                    "Conflict updating {} of {} (attempt {}/{}), retrying",
                    key, name, attempt, UPDATE_ATTEMPTS
                );
                sleep(Duration::from_millis(backoff)).await;
                backoff = (backoff * 2).min(MAX_BACKOFF_MS);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(PeersyncError::ConflictRetriesExhausted(format!(
        "{} of {}",
        key, name
    )))
}

/// Replace the status sub-tree through the status subresource, with the
/// same conflict-retry loop as [`update_subtree`].
pub async fn update_status(
    api: &Api<DynamicObject>,
    name: &str,
    status: Option<&Value>,
) -> Result<()> {
    let mut backoff = INITIAL_BACKOFF_MS;

    for attempt in 1..=UPDATE_ATTEMPTS {
        let mut latest = api.get(name).await?;
        set_subtree(&mut latest, "status", status)?;

        let body = serde_json::to_vec(&latest)
            .map_err(|e| PeersyncError::MalformedObject(format!("{}: {}", name, e)))?;
        match api.replace_status(name, &PostParams::default(), body).await {
            Ok(_) => return Ok(()),
            Err(kube::Error::Api(err)) if err.code == 409 => {
                debug!(
                    "Conflict updating status of {} (attempt {}/{}), retrying",
                    name, attempt, UPDATE_ATTEMPTS
                );
                sleep(Duration::from_millis(backoff)).await;
                backoff = (backoff * 2).min(MAX_BACKOFF_MS);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(PeersyncError::ConflictRetriesExhausted(format!(
        "status of {}",
        name
    )))
}

/// Delete an object, treating not-found as the desired terminal state
pub async fn delete_tolerant(api: &Api<DynamicObject>, name: &str) -> Result<()> {
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(err)) if err.code == 404 => {
            debug!("Object {} already absent, nothing to delete", name);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn set_subtree(obj: &mut DynamicObject, key: &str, value: Option<&Value>) -> Result<()> {
    let Some(map) = obj.data.as_object_mut() else {
        return Err(PeersyncError::MalformedObject(format!(
            "object body of {} is not a map",
            obj.metadata.name.as_deref().unwrap_or("<unknown>")
        )));
    };
    match value {
        Some(v) => {
            map.insert(key.to_string(), v.clone());
        }
        None => {
            map.remove(key);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{dynamic_object_json, not_found_json, test_api_resource, MockService};
    use serde_json::json;

    fn make_object(name: &str, data: Value) -> DynamicObject {
        let mut obj = DynamicObject::new(name, &test_api_resource());
        obj.data = data;
        obj
    }

    #[test]
    fn test_subtree_equal_both_present() {
        let a = make_object("a", json!({"spec": {"cidr": "10.0.0.0/16"}}));
        let b = make_object("b", json!({"spec": {"cidr": "10.0.0.0/16"}}));
        assert!(subtree_equal(&a, &b, "spec"));
    }

    #[test]
    fn test_subtree_equal_mismatch() {
        let a = make_object("a", json!({"spec": {"cidr": "10.0.0.0/16"}}));
        let b = make_object("b", json!({"spec": {"cidr": "10.1.0.0/16"}}));
        assert!(!subtree_equal(&a, &b, "spec"));
    }

    #[test]
    fn test_subtree_equal_absent_on_both() {
        let a = make_object("a", json!({"spec": {}}));
        let b = make_object("b", json!({"spec": {}}));
        assert!(subtree_equal(&a, &b, "status"));
    }

    #[test]
    fn test_subtree_equal_absent_on_one() {
        let a = make_object("a", json!({"spec": {}, "status": {"ready": true}}));
        let b = make_object("b", json!({"spec": {}}));
        assert!(!subtree_equal(&a, &b, "status"));
    }

    #[test]
    fn test_set_subtree_insert_and_remove() {
        let mut obj = make_object("a", json!({"spec": {"x": 1}}));
        set_subtree(&mut obj, "status", Some(&json!({"ready": true}))).unwrap();
        assert_eq!(subtree(&obj, "status"), Some(&json!({"ready": true})));

        set_subtree(&mut obj, "status", None).unwrap();
        assert!(subtree(&obj, "status").is_none());
    }

    #[tokio::test]
    async fn test_get_opt_found() {
        let mock = MockService::new().on_get(
            "/apis/net.geeko.me/v1alpha1/namespaces/default/networkconfigs/cfg",
            200,
            &dynamic_object_json("cfg", "default", json!({"spec": {"cidr": "10.0.0.0/16"}})),
        );
        let api: Api<DynamicObject> =
            Api::namespaced_with(mock.into_client(), "default", &test_api_resource());

        let obj = get_opt(&api, "cfg").await.unwrap();
        assert!(obj.is_some());
        assert_eq!(
            subtree(&obj.unwrap(), "spec"),
            Some(&json!({"cidr": "10.0.0.0/16"}))
        );
    }

    #[tokio::test]
    async fn test_get_opt_not_found_is_none() {
        let mock = MockService::new().on_get(
            "/apis/net.geeko.me/v1alpha1/namespaces/default/networkconfigs/cfg",
            404,
            &not_found_json("networkconfigs", "cfg"),
        );
        let api: Api<DynamicObject> =
            Api::namespaced_with(mock.into_client(), "default", &test_api_resource());

        let obj = get_opt(&api, "cfg").await.unwrap();
        assert!(obj.is_none());
    }

    #[tokio::test]
    async fn test_delete_tolerant_not_found_is_ok() {
        let mock = MockService::new().on_delete(
            "/apis/net.geeko.me/v1alpha1/namespaces/default/networkconfigs/cfg",
            404,
            &not_found_json("networkconfigs", "cfg"),
        );
        let api: Api<DynamicObject> =
            Api::namespaced_with(mock.into_client(), "default", &test_api_resource());

        assert!(delete_tolerant(&api, "cfg").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_tolerant_success() {
        let mock = MockService::new().on_delete(
            "/apis/net.geeko.me/v1alpha1/namespaces/default/networkconfigs/cfg",
            200,
            &dynamic_object_json("cfg", "default", json!({})),
        );
        let api: Api<DynamicObject> =
            Api::namespaced_with(mock.into_client(), "default", &test_api_resource());

        assert!(delete_tolerant(&api, "cfg").await.is_ok());
    }
}
