// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use serde_json::Value;

/// Older files stored monitor intervals in whole seconds.
pub(super) fn migrate_on_load(mut value: Value) -> Value {
    if let Some(monitor) = value.get_mut("monitor").and_then(Value::as_object_mut) {
        for (old, new) in [
            ("metrics_interval_secs", "metrics_interval_ms"),
            ("thermal_interval_secs", "thermal_interval_ms"),
        ] {
            if monitor.contains_key(new) {
                monitor.remove(old);
                continue;
            }
            if let Some(secs) = monitor.remove(old).and_then(|v| v.as_u64()) {
                monitor.insert(new.to_string(), Value::from(secs.saturating_mul(1000)));
            }
        }
    }
    value
}

/// Deep-merge two JSON values.
/// `base` is existing file content, `overlay` is serialized current struct.
/// Overlay values take priority.
pub(super) fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = if let Some(base_val) = base_map.remove(&key) {
                    deep_merge(base_val, overlay_val)
                } else {
                    overlay_val
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_base, overlay) => overlay,
    }
}
