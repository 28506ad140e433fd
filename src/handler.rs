//! JSON request/response contract for planning requests.
//!
//! A request is `{ grid, max_stitches?, max_jump?, projectID? }`. Success
//! answers 200 with the segment array; validation failures answer 400 and
//! internal failures 500, both with an `{ "error": ... }` body.

use crate::error::{json_kind, PlanError, ValidationError};
use crate::grid::Grid;
use crate::segmentation::{segment_grid, Segment, SegmentationConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

const SEGMENT_CACHE_VERSION: u8 = 1;
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

const POSITIVE: &str = "a positive integer";
const NON_NEGATIVE: &str = "a non-negative integer";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub grid: Option<Value>,
    #[serde(default, alias = "maxStitches")]
    pub max_stitches: Option<i64>,
    #[serde(default, alias = "maxJump")]
    pub max_jump: Option<i64>,
    #[serde(default, alias = "projectID", alias = "projectId")]
    pub project_id: Option<String>,
}

impl PlanRequest {
    pub fn from_json(body: &str) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|err| ValidationError::MalformedRequest(err.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        if !value.is_object() {
            return Err(ValidationError::MalformedRequest(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }
        serde_json::from_value(value).map_err(|err| ValidationError::MalformedRequest(err.to_string()))
    }

    pub fn grid(&self) -> Result<Grid, ValidationError> {
        let value = self.grid.as_ref().ok_or(ValidationError::MissingGrid)?;
        Grid::from_json(value)
    }

    /// Request limits layered over `defaults`.
    pub fn config(&self, defaults: &SegmentationConfig) -> Result<SegmentationConfig, ValidationError> {
        Ok(SegmentationConfig {
            max_stitches: read_limit("max_stitches", self.max_stitches, defaults.max_stitches, 1)?,
            max_jump: read_limit("max_jump", self.max_jump, defaults.max_jump, 0)?,
            ..defaults.clone()
        })
    }
}

fn read_limit(
    name: &'static str,
    value: Option<i64>,
    default: u32,
    min: i64,
) -> Result<u32, ValidationError> {
    let Some(value) = value else {
        return Ok(default);
    };
    if value < min || value > u32::MAX as i64 {
        return Err(ValidationError::LimitOutOfRange {
            name,
            expectation: if min > 0 { POSITIVE } else { NON_NEGATIVE },
            value,
        });
    }
    Ok(value as u32)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    pub fn ok(segments: &[Segment]) -> Self {
        match serde_json::to_string(segments) {
            Ok(body) => Self {
                status_code: 200,
                body,
            },
            Err(err) => Self::error(500, &format!("Failed to serialize segments: {err}")),
        }
    }

    pub fn from_error(err: &PlanError) -> Self {
        let status_code = if err.is_validation() { 400 } else { 500 };
        Self::error(status_code, &err.to_string())
    }

    fn error(status_code: u16, message: &str) -> Self {
        Self {
            status_code,
            body: serde_json::json!({ "error": message }).to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// SHA-256 over the grid labels and the limits that affect output.
pub fn cache_key(grid: &Grid, config: &SegmentationConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update([SEGMENT_CACHE_VERSION]);
    hasher.update(config.max_stitches.to_le_bytes());
    hasher.update(config.max_jump.to_le_bytes());
    hasher.update([config.require_rectangular as u8]);
    hasher.update((grid.row_count() as u64).to_le_bytes());
    for row in grid.rows() {
        hasher.update((row.len() as u64).to_le_bytes());
        for cell in row {
            match cell.as_deref() {
                Some(label) if !label.is_empty() => {
                    hasher.update([1u8]);
                    hasher.update((label.len() as u64).to_le_bytes());
                    hasher.update(label.as_bytes());
                }
                _ => hasher.update([0u8]),
            }
        }
    }
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Default)]
struct CacheEntries {
    order: VecDeque<String>,
    segments: HashMap<String, Arc<Vec<Segment>>>,
}

/// Bounded map of finished segmentations; the oldest entry goes first.
#[derive(Debug)]
pub struct SegmentCache {
    capacity: usize,
    entries: Mutex<CacheEntries>,
}

impl SegmentCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(CacheEntries::default()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<Segment>>> {
        let entries = self.entries.lock().ok()?;
        entries.segments.get(key).cloned()
    }

    pub fn insert(&self, key: String, segments: Arc<Vec<Segment>>) {
        if self.capacity == 0 {
            return;
        }
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        if entries.segments.insert(key.clone(), segments).is_some() {
            return;
        }
        entries.order.push_back(key);
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.segments.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.segments.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SegmentCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

/// Host-side entry point: default limits plus a result cache.
#[derive(Debug, Default)]
pub struct Planner {
    defaults: SegmentationConfig,
    cache: SegmentCache,
}

impl Planner {
    pub fn new(defaults: SegmentationConfig) -> Self {
        Self {
            defaults,
            cache: SegmentCache::default(),
        }
    }

    pub fn with_cache_capacity(defaults: SegmentationConfig, capacity: usize) -> Self {
        Self {
            defaults,
            cache: SegmentCache::new(capacity),
        }
    }

    pub fn defaults(&self) -> &SegmentationConfig {
        &self.defaults
    }

    pub fn cache(&self) -> &SegmentCache {
        &self.cache
    }

    pub fn plan(&self, request: &PlanRequest) -> Result<Arc<Vec<Segment>>, PlanError> {
        let grid = request.grid()?;
        let config = request.config(&self.defaults)?;
        self.plan_grid(&grid, &config)
    }

    pub fn plan_grid(
        &self,
        grid: &Grid,
        config: &SegmentationConfig,
    ) -> Result<Arc<Vec<Segment>>, PlanError> {
        config.validate()?;
        let key = cache_key(grid, config);
        if let Some(hit) = self.cache.get(&key) {
            log::debug!("Segment cache hit: {}", key);
            return Ok(hit);
        }

        let segments = Arc::new(segment_grid(grid, config)?);
        self.cache.insert(key, Arc::clone(&segments));
        Ok(segments)
    }

    /// Answers a raw JSON request body.
    pub fn handle_body(&self, body: &str) -> HandlerResponse {
        self.respond(PlanRequest::from_json(body))
    }

    /// Answers an invocation event: a bare request object, an HTTP-style
    /// envelope with a `body` (string or object), or a resolver-style
    /// envelope with `arguments`.
    pub fn handle_event(&self, event: &Value) -> HandlerResponse {
        self.respond(unwrap_event(event))
    }

    fn respond(&self, request: Result<PlanRequest, ValidationError>) -> HandlerResponse {
        let result = request
            .map_err(PlanError::from)
            .and_then(|request| self.plan(&request));
        match result {
            Ok(segments) => HandlerResponse::ok(&segments),
            Err(err) => {
                if err.is_validation() {
                    log::warn!("Rejected planning request: {}", err);
                } else {
                    log::error!("Planning request failed: {}", err);
                }
                HandlerResponse::from_error(&err)
            }
        }
    }
}

fn unwrap_event(event: &Value) -> Result<PlanRequest, ValidationError> {
    let Some(fields) = event.as_object() else {
        return Err(ValidationError::MalformedRequest(format!(
            "expected a JSON object, got {}",
            json_kind(event)
        )));
    };

    match (fields.get("body"), fields.get("arguments")) {
        (Some(Value::String(body)), _) => PlanRequest::from_json(body),
        (Some(body @ Value::Object(_)), _) => PlanRequest::from_value(body.clone()),
        (_, Some(arguments @ Value::Object(_))) => PlanRequest::from_value(arguments.clone()),
        _ => PlanRequest::from_value(event.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Coordinate;
    use serde_json::json;

    fn body_json(response: &HandlerResponse) -> Value {
        serde_json::from_str(&response.body).expect("response body should be JSON")
    }

    #[test]
    fn success_returns_segment_array() {
        let planner = Planner::default();
        let response = planner.handle_body(r#"{"grid": [["red", "red"], ["red", "red"]]}"#);

        assert_eq!(response.status_code, 200);
        assert_eq!(
            body_json(&response),
            json!([{ "color": "red", "path": [[0, 0], [0, 1], [1, 0], [1, 1]] }])
        );
    }

    #[test]
    fn null_row_is_a_validation_error_naming_the_row() {
        let planner = Planner::default();
        let response = planner.handle_body(r#"{"grid": [["red", "red"], null]}"#);

        assert_eq!(response.status_code, 400);
        let message = body_json(&response)["error"].as_str().unwrap().to_string();
        assert!(message.contains("Row 1"), "unexpected message: {message}");
        assert!(planner.cache().is_empty());
    }

    #[test]
    fn empty_grid_is_not_an_error() {
        let response = Planner::default().handle_body(r#"{"grid": []}"#);
        assert_eq!(response.status_code, 200);
        assert_eq!(body_json(&response), json!([]));
    }

    #[test]
    fn missing_grid_and_bad_json_are_rejected() {
        let planner = Planner::default();
        let missing = planner.handle_body(r#"{"max_jump": 2}"#);
        assert_eq!(missing.status_code, 400);
        assert_eq!(body_json(&missing), json!({ "error": "Request is missing a grid" }));

        let garbled = planner.handle_body("{grid:");
        assert_eq!(garbled.status_code, 400);

        let not_object = planner.handle_body("[1, 2]");
        assert_eq!(not_object.status_code, 400);
    }

    #[test]
    fn camel_case_aliases_are_accepted() {
        let request = PlanRequest::from_json(
            r#"{"grid": [], "maxStitches": 12, "maxJump": 0, "projectID": "p-1"}"#,
        )
        .unwrap();
        let config = request.config(&SegmentationConfig::default()).unwrap();
        assert_eq!(config.max_stitches, 12);
        assert_eq!(config.max_jump, 0);
        assert_eq!(request.project_id.as_deref(), Some("p-1"));
    }

    #[test]
    fn omitted_limits_fall_back_to_planner_defaults() {
        let request = PlanRequest::from_json(r#"{"grid": [], "max_jump": null}"#).unwrap();
        let defaults = SegmentationConfig::new(40, 3);
        assert_eq!(request.config(&defaults).unwrap(), defaults);
    }

    #[test]
    fn out_of_range_limits_are_rejected() {
        let planner = Planner::default();
        for body in [
            r#"{"grid": [["a"]], "max_stitches": 0}"#,
            r#"{"grid": [["a"]], "max_stitches": -4}"#,
            r#"{"grid": [["a"]], "max_jump": -1}"#,
            r#"{"grid": [["a"]], "max_jump": 99999999999}"#,
        ] {
            assert_eq!(planner.handle_body(body).status_code, 400, "{body}");
        }

        let err = PlanRequest::from_json(r#"{"grid": [], "max_jump": -1}"#)
            .unwrap()
            .config(&SegmentationConfig::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "max_jump must be a non-negative integer, got -1");
    }

    #[test]
    fn envelopes_are_unwrapped() {
        let planner = Planner::default();
        let expected = json!([
            { "color": "red", "path": [[0, 0]] },
            { "color": "red", "path": [[0, 2]] },
            { "color": "blue", "path": [[0, 1]] }
        ]);
        let request = json!({ "grid": [["red", "blue", "red"]], "max_jump": 1 });

        let events = [
            request.clone(),
            json!({ "body": request.to_string() }),
            json!({ "body": request.clone() }),
            json!({ "arguments": request.clone() }),
        ];
        for event in events {
            let response = planner.handle_event(&event);
            assert_eq!(response.status_code, 200, "{event}");
            assert_eq!(body_json(&response), expected);
        }

        assert_eq!(planner.handle_event(&json!("grid")).status_code, 400);
    }

    #[test]
    fn computation_errors_map_to_server_errors() {
        let response = HandlerResponse::from_error(&PlanError::Computation("boom".to_string()));
        assert_eq!(response.status_code, 500);
        assert!(!response.is_success());
        assert_eq!(
            body_json(&response),
            json!({ "error": "Segmentation invariant violated: boom" })
        );
    }

    #[test]
    fn repeated_requests_are_served_from_cache() {
        let planner = Planner::default();
        let request = PlanRequest::from_json(r#"{"grid": [["a", "b"], ["b", "a"]]}"#).unwrap();

        let first = planner.plan(&request).unwrap();
        let second = planner.plan(&request).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(planner.cache().len(), 1);
    }

    #[test]
    fn custom_capacity_bounds_the_planner_cache() {
        let planner = Planner::with_cache_capacity(SegmentationConfig::new(8, 2), 1);
        assert_eq!(planner.defaults(), &SegmentationConfig::new(8, 2));

        let first = PlanRequest::from_json(r#"{"grid": [["a"]]}"#).unwrap();
        let second = PlanRequest::from_json(r#"{"grid": [["b"]]}"#).unwrap();
        let kept = planner.plan(&first).unwrap();
        planner.plan(&second).unwrap();
        assert_eq!(planner.cache().len(), 1);

        // The first result was evicted, so planning it again builds a new value.
        let rebuilt = planner.plan(&first).unwrap();
        assert!(!Arc::ptr_eq(&kept, &rebuilt));
        assert_eq!(kept, rebuilt);

        let uncached = Planner::with_cache_capacity(SegmentationConfig::default(), 0);
        uncached.plan(&first).unwrap();
        assert!(uncached.cache().is_empty());
    }

    #[test]
    fn cache_key_tracks_limits_and_labels() {
        let grid = Grid::from_labels(&[vec!["a", "b"]]);
        let base = cache_key(&grid, &SegmentationConfig::new(10, 1));

        assert_eq!(base, cache_key(&grid, &SegmentationConfig::new(10, 1)));
        assert_ne!(base, cache_key(&grid, &SegmentationConfig::new(10, 2)));
        assert_ne!(base, cache_key(&grid, &SegmentationConfig::new(11, 1)));
        assert_ne!(
            base,
            cache_key(&Grid::from_labels(&[vec!["a", "c"]]), &SegmentationConfig::new(10, 1))
        );
        // Label boundaries are length-prefixed.
        assert_ne!(
            cache_key(&Grid::from_labels(&[vec!["ab", "c"]]), &SegmentationConfig::default()),
            cache_key(&Grid::from_labels(&[vec!["a", "bc"]]), &SegmentationConfig::default())
        );
    }

    #[test]
    fn cache_evicts_oldest_entry() {
        let cache = SegmentCache::new(2);
        let segments = Arc::new(vec![Segment {
            color: "a".to_string(),
            path: vec![Coordinate::new(0, 0)],
        }]);
        cache.insert("one".to_string(), Arc::clone(&segments));
        cache.insert("two".to_string(), Arc::clone(&segments));
        cache.insert("three".to_string(), Arc::clone(&segments));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("one").is_none());
        assert!(cache.get("three").is_some());

        let disabled = SegmentCache::new(0);
        disabled.insert("one".to_string(), segments);
        assert!(disabled.is_empty());
    }
}
