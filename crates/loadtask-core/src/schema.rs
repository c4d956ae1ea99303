//! Result payload schemas (draft-04 JSON Schema) and validation.
//!
//! These are the wire/storage formats exchanged with result importers and
//! report renderers. Validators are compiled once on first use.

use std::sync::LazyLock;

use jsonschema::Validator;
use serde_json::{Value, json};

use crate::domain::ValidationErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Output,
    HookRunResult,
    HookResults,
    TaskResult,
    TaskExtendedResult,
}

impl SchemaKind {
    pub fn name(self) -> &'static str {
        match self {
            SchemaKind::Output => "output",
            SchemaKind::HookRunResult => "hook run result",
            SchemaKind::HookResults => "hook results",
            SchemaKind::TaskResult => "task result",
            SchemaKind::TaskExtendedResult => "task extended result",
        }
    }

    pub fn schema(self) -> Value {
        match self {
            SchemaKind::Output => output_schema(),
            SchemaKind::HookRunResult => hook_run_result_schema(),
            SchemaKind::HookResults => hook_results_schema(),
            SchemaKind::TaskResult => task_result_schema(),
            SchemaKind::TaskExtendedResult => task_extended_result_schema(),
        }
    }

    fn validator(self) -> &'static Validator {
        static OUTPUT: LazyLock<Validator> = LazyLock::new(|| compile(SchemaKind::Output));
        static HOOK_RUN: LazyLock<Validator> =
            LazyLock::new(|| compile(SchemaKind::HookRunResult));
        static HOOKS: LazyLock<Validator> = LazyLock::new(|| compile(SchemaKind::HookResults));
        static TASK: LazyLock<Validator> = LazyLock::new(|| compile(SchemaKind::TaskResult));
        static EXTENDED: LazyLock<Validator> =
            LazyLock::new(|| compile(SchemaKind::TaskExtendedResult));
        match self {
            SchemaKind::Output => &*OUTPUT,
            SchemaKind::HookRunResult => &*HOOK_RUN,
            SchemaKind::HookResults => &*HOOKS,
            SchemaKind::TaskResult => &*TASK,
            SchemaKind::TaskExtendedResult => &*EXTENDED,
        }
    }

    /// Collects every violated rule; never stops at the first one.
    pub fn validate(self, instance: &Value) -> Result<(), ValidationErrors> {
        let violations: Vec<String> = self
            .validator()
            .iter_errors(instance)
            .map(|e| e.to_string())
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                schema: self.name(),
                violations,
            })
        }
    }
}

// `format` is an annotation only; stored timestamps use custom layouts.
fn compile(kind: SchemaKind) -> Validator {
    jsonschema::draft4::options()
        .should_validate_formats(false)
        .build(&kind.schema())
        .expect("built-in schemas are valid draft-04")
}

fn chart_props(data: Value) -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": {"type": "string"},
            "description": {"type": "string"},
            "chart_plugin": {"type": "string"},
            "data": data,
            "label": {"type": "string"},
            "axis_label": {"type": "string"}
        },
        "required": ["title", "chart_plugin", "data"],
        "additionalProperties": false
    })
}

fn sla_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "criterion": {"type": "string"},
                "detail": {"type": "string"},
                "success": {"type": "boolean"}
            }
        }
    })
}

pub fn output_schema() -> Value {
    let additive_data = json!({
        "type": "array",
        "items": {
            "type": "array",
            "items": [{"type": "string"}, {"type": "number"}],
            "additionalItems": false
        }
    });
    let complete_data = json!({"anyOf": [
        {
            "type": "array",
            "items": {
                "type": "array",
                "items": [
                    {"type": "string"},
                    {"anyOf": [
                        {"type": "array",
                         "items": {"type": "array",
                                   "items": [{"type": "number"}, {"type": "number"}]}},
                        {"type": "number"}
                    ]}
                ]
            }
        },
        {
            "type": "object",
            "properties": {
                "cols": {"type": "array", "items": {"type": "string"}},
                "rows": {
                    "type": "array",
                    "items": {
                        "type": "array",
                        "items": {"anyOf": [{"type": "string"}, {"type": "number"}]}
                    }
                }
            },
            "required": ["cols", "rows"],
            "additionalProperties": false
        },
        {"type": "array", "items": {"type": "string"}}
    ]});
    json!({
        "type": "object",
        "properties": {
            "additive": {"type": "array", "items": chart_props(additive_data)},
            "complete": {"type": "array", "items": chart_props(complete_data)}
        },
        "required": ["additive", "complete"],
        "additionalProperties": false
    })
}

pub fn hook_run_result_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "started_at": {"type": "number"},
            "finished_at": {"type": "number"},
            "triggered_by": {
                "type": "object",
                "properties": {"event_type": {"type": "string"}, "value": {}},
                "required": ["event_type", "value"],
                "additionalProperties": false
            },
            "status": {"type": "string"},
            "error": {
                "type": "array",
                "minItems": 3,
                "maxItems": 3,
                "items": {"type": "string"}
            },
            "output": output_schema()
        },
        "required": ["finished_at", "triggered_by", "status"],
        "additionalProperties": false
    })
}

pub fn hook_results_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "config": {"type": "object"},
            "results": {"type": "array", "items": hook_run_result_schema()},
            "summary": {"type": "object"}
        },
        "required": ["config", "results", "summary"],
        "additionalProperties": false
    })
}

pub fn task_result_schema() -> Value {
    json!({
        "type": "object",
        "$schema": "http://json-schema.org/draft-04/schema",
        "properties": {
            "key": {
                "type": "object",
                "properties": {
                    "kw": {"type": "object"},
                    "name": {"type": "string"},
                    "pos": {"type": "integer"}
                },
                "required": ["kw", "name", "pos"]
            },
            "sla": sla_schema(),
            "hooks": {"type": "array", "items": hook_results_schema()},
            "result": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "atomic_actions": {"oneOf": [{"type": "array"}, {"type": "object"}]},
                        "duration": {"type": "number"},
                        "error": {"type": "array"},
                        "idle_duration": {"type": "number"},
                        "scenario_output": {
                            "type": "object",
                            "properties": {
                                "data": {"type": "object"},
                                "errors": {"type": "string"}
                            },
                            "required": ["data", "errors"]
                        },
                        "output": output_schema()
                    },
                    "required": ["atomic_actions", "duration", "error", "idle_duration"]
                },
                "minItems": 1
            },
            "load_duration": {"type": "number"},
            "full_duration": {"type": "number"},
            "created_at": {"type": "string"}
        },
        "required": ["key", "sla", "result", "load_duration", "full_duration"],
        "additionalProperties": false
    })
}

pub fn task_extended_result_schema() -> Value {
    json!({
        "type": "object",
        "$schema": "http://json-schema.org/draft-04/schema",
        "properties": {
            "id": {"type": "integer"},
            "position": {"type": "integer"},
            "task_uuid": {"type": "string"},
            "name": {"type": "string"},
            "load_duration": {"type": "number"},
            "full_duration": {"type": "number"},
            "data": {"type": "array"},
            "sla": sla_schema(),
            "hooks": {"type": "array", "items": hook_results_schema()},
            "iterations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "timestamp": {"type": "number"},
                        "atomic_actions": {"type": "array"},
                        "duration": {"type": "number"},
                        "error": {"type": "array"},
                        "idle_duration": {"type": "number"},
                        "output": output_schema()
                    },
                    "required": ["atomic_actions", "duration", "error", "idle_duration", "output"]
                },
                "minItems": 1
            },
            "created_at": {"anyOf": [{"type": "string", "format": "date-time"}]},
            "updated_at": {"anyOf": [{"type": "string", "format": "date-time"}]},
            "info": {
                "type": "object",
                "properties": {
                    "atomic": {"type": "object"},
                    "iterations_count": {"type": "integer"},
                    "iterations_failed": {"type": "integer"},
                    "min_duration": {"type": "number"},
                    "max_duration": {"type": "number"},
                    "tstamp_start": {"type": "number"},
                    "full_duration": {"type": "number"},
                    "load_duration": {"type": "number"}
                }
            }
        },
        "required": ["name", "position", "sla", "iterations", "info"],
        "additionalProperties": false
    })
}
