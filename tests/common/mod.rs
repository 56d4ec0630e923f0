#![allow(dead_code)]

use std::sync::Arc;

use panel_core::form::FormState;
use panel_core::matrix::{MatrixEditor, MatrixGrid};
use panel_core::model::{FormSchema, MatrixHeaders, MatrixRows};
use panel_core::schema::{decode_form_schema, decode_matrix_data, decode_matrix_headers};
use panel_core::validation::CompileOptions;
use serde_json::{json, Value};

/// The two-field form used across the end-to-end tests.
pub fn person_schema_payload() -> Value {
    json!({"sections": {"general": {"fields": {
        "name": {"kind": "text", "required": true},
        "age": {"kind": "number", "validation": {"gte": 18}}
    }}}})
}

/// Broker settings with a generated slug, an email and a tier list.
pub fn broker_schema_payload() -> Value {
    json!({"sections": {
        "general": {"description": "Basic details", "fields": {
            "name": {"type": "text", "label": "Name", "required": true},
            "slug": {"type": "text", "label": "Slug"},
            "email": {"type": "text", "label": "Email", "validation": {"email": true}},
            "currency": {"type": "select", "label": "Currency",
                         "options": [{"value": "EUR"}, {"value": "USD"}]}
        }},
        "fees": {"fields": {
            "tiers": {"type": "array", "label": "Tiers", "children": {
                "from": {"type": "number", "label": "From", "required": true},
                "rate": {"type": "number", "label": "Rate", "validation": {"positive": true}}
            }}
        }}
    }})
}

pub fn form(payload: &Value) -> FormState {
    let schema: FormSchema = decode_form_schema(payload).expect("decode schema");
    FormState::new(Arc::new(schema), &CompileOptions::default()).expect("build form")
}

pub fn matrix_headers() -> MatrixHeaders {
    decode_matrix_headers(&json!({
        "columnHeaders": [
            {"slug": "spread", "name": "Spread", "formType": {"name": "rate", "items": [
                {"name": "amount", "type": "number"},
                {"name": "unit", "type": "select",
                 "options": [{"value": "pips", "label": "Pips"}, {"value": "points", "label": "Points"}]}
            ]}},
            {"slug": "swap", "name": "Swap", "formType": {"name": "swap", "items": [
                {"name": "long", "type": "number"},
                {"name": "short", "type": "number"}
            ]}},
            {"slug": "enabled", "name": "Enabled", "formType": {"name": "flag", "items": [
                {"name": "on", "type": "checkbox"}
            ]}}
        ],
        "rowHeaders": [
            {"slug": "eurusd", "name": "EUR/USD"},
            {"slug": "gbpusd", "name": "GBP/USD"},
            {"slug": "usdjpy", "name": "USD/JPY"}
        ]
    }))
    .expect("decode headers")
}

/// Sparse data: row 0 is complete, row 1 has one cell, row 2 is absent.
pub fn matrix_data() -> MatrixRows {
    decode_matrix_data(&json!({
        "0": [
            {"rowHeader": "eurusd", "colHeader": "spread", "type": "rate",
             "value": {"amount": 0.4, "unit": "pips"}, "public_value": {"amount": 0.4, "unit": "pips"}},
            {"rowHeader": "eurusd", "colHeader": "swap", "type": "swap",
             "value": {"long": -1.5, "short": 0.3}},
            {"rowHeader": "eurusd", "colHeader": "enabled", "type": "flag", "value": {"on": true}}
        ],
        "1": [
            {"rowHeader": "gbpusd", "colHeader": "spread", "type": "rate", "value": {"amount": 0.9}}
        ]
    }))
    .expect("decode data")
}

pub fn editor(is_admin: bool) -> MatrixEditor {
    MatrixEditor::new(MatrixGrid::assemble(matrix_headers(), matrix_data()), is_admin)
}
