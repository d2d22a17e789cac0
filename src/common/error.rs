// src/common/error.rs

use std::borrow::Cow;

use std::error::Error as _;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] ValidationErrors),

    // Corpo ou query string que nem chegou a desserializar
    #[error("Requisição malformada")]
    MalformedRequest(Vec<FieldError>),

    #[error("{0} não encontrado")]
    NotFound(String),

    #[error("Registro duplicado: {0}")]
    Duplicate(String),

    #[error("Intervalo de datas inválido: {0}")]
    InvalidDateRange(String),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn not_found(entity: &str) -> Self {
        AppError::NotFound(entity.to_string())
    }
}

/// Um item do corpo `{ "errors": [...] }` devolvido quando o payload é inválido.
#[derive(Debug, Serialize, PartialEq)]
pub struct FieldError {
    pub message: String,
    pub path: Vec<Value>,
}

/// Achata os erros do `validator` (inclusive structs e listas aninhadas)
/// no formato `{message, path}`.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect_field_errors(errors, &mut Vec::new(), &mut out);
    // HashMap não garante ordem; ordenamos pelo caminho para respostas estáveis
    out.sort_by(|a, b| path_key(&a.path).cmp(&path_key(&b.path)));
    out
}

fn collect_field_errors(errors: &ValidationErrors, prefix: &mut Vec<Value>, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        prefix.push(Value::String(camel_case(field)));
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    let message = err
                        .message
                        .clone()
                        .unwrap_or_else(|| Cow::Owned(err.code.to_string()));
                    out.push(FieldError {
                        message: message.to_string(),
                        path: prefix.clone(),
                    });
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(inner, prefix, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    prefix.push(Value::from(*index));
                    collect_field_errors(inner, prefix, out);
                    prefix.pop();
                }
            }
        }
        prefix.pop();
    }
}

// Os payloads trafegam em camelCase; o `validator` reporta o nome do campo Rust.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let detail = rejection
            .source()
            .map(ToString::to_string)
            .unwrap_or_else(|| rejection.body_text());
        AppError::MalformedRequest(vec![deserialize_error(&detail)])
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        let detail = rejection
            .source()
            .map(ToString::to_string)
            .unwrap_or_else(|| rejection.body_text());
        AppError::MalformedRequest(vec![deserialize_error(&detail)])
    }
}

// O erro do serde vem como "caminho: mensagem" (ex.: "feedback[0].fieldType: unknown variant ...").
// Sem caminho, a mensagem vem sozinha.
fn deserialize_error(detail: &str) -> FieldError {
    let (path_text, message) = match detail.split_once(": ") {
        Some((path, message)) if !path.contains(char::is_whitespace) => (path, message),
        _ => ("", detail),
    };
    let message = message.rsplit_once(" at line ").map_or(message, |(head, _)| head);

    let mut path = serde_path(path_text);
    if let Some(field) = message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
    {
        path.push(Value::String(field.to_string()));
        return FieldError { message: "Campo obrigatório".to_string(), path };
    }

    FieldError { message: message.to_string(), path }
}

fn serde_path(text: &str) -> Vec<Value> {
    let mut path = Vec::new();
    for segment in text.split('.') {
        let mut parts = segment.split('[');
        if let Some(name) = parts.next().filter(|name| !name.is_empty() && *name != "?") {
            path.push(Value::String(name.to_string()));
        }
        for index in parts {
            if let Ok(index) = index.trim_end_matches(']').parse::<u64>() {
                path.push(Value::from(index));
            }
        }
    }
    path
}

fn path_key(path: &[Value]) -> String {
    path.iter()
        .map(|segment| match segment {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(errors) => {
                let body = Json(json!({ "errors": field_errors(&errors) }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::MalformedRequest(errors) => {
                let body = Json(json!({ "errors": errors }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::NotFound(entity) => (StatusCode::NOT_FOUND, format!("{} não encontrado.", entity)),
            AppError::Duplicate(message) => (StatusCode::CONFLICT, message),
            AppError::InvalidDateRange(message) => (StatusCode::BAD_REQUEST, message),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "E-mail ou senha inválidos.".to_string()),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.".to_string(),
            ),

            // Todos os outros erros (DatabaseError, InternalServerError...) viram 500.
            // O detalhe vai para o log, o cliente recebe só a mensagem genérica.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.".to_string())
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Item {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
    }

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "leadIds must not be empty"))]
        lead_ids: Vec<String>,
        #[validate(nested)]
        items: Vec<Item>,
    }

    #[test]
    fn flattens_nested_errors_into_paths() {
        let payload = Payload {
            lead_ids: vec![],
            items: vec![Item { name: "ok".into() }, Item { name: String::new() }],
        };

        let errors = payload.validate().unwrap_err();
        let flat = field_errors(&errors);

        assert_eq!(
            flat,
            vec![
                FieldError {
                    message: "name is required".into(),
                    path: vec![json!("items"), json!(1), json!("name")],
                },
                FieldError {
                    message: "leadIds must not be empty".into(),
                    path: vec![json!("leadIds")],
                },
            ]
        );
    }

    #[derive(Debug, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    #[allow(dead_code)]
    struct FeedbackBody {
        call_status: crate::models::lead::CallStatus,
        feedback: Vec<FeedbackBodyItem>,
    }

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct FeedbackBodyItem {
        name: String,
    }

    #[derive(Debug, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    #[allow(dead_code)]
    struct Range {
        from_date: String,
        to_date: String,
    }

    fn malformed(err: AppError) -> Vec<FieldError> {
        match err {
            AppError::MalformedRequest(errors) => errors,
            other => panic!("esperava MalformedRequest, veio {other:?}"),
        }
    }

    #[test]
    fn unknown_enum_variant_points_at_the_field() {
        let rejection = Json::<FeedbackBody>::from_bytes(br#"{"callStatus":"DONE","feedback":[]}"#).unwrap_err();
        let errors = malformed(rejection.into());

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, vec![json!("callStatus")]);
        assert!(errors[0].message.contains("DONE"));
        assert!(!errors[0].message.contains("line"));
    }

    #[test]
    fn missing_nested_field_includes_list_index() {
        let rejection =
            Json::<FeedbackBody>::from_bytes(br#"{"callStatus":"SUCCESS","feedback":[{"name":"a"},{}]}"#).unwrap_err();
        let errors = malformed(rejection.into());

        assert_eq!(errors[0].path, vec![json!("feedback"), json!(1), json!("name")]);
        assert_eq!(errors[0].message, "Campo obrigatório");
    }

    #[test]
    fn missing_query_parameter_is_reported_by_name() {
        let uri: axum::http::Uri = "/api/dashboard/leads?fromDate=2025-01-01".parse().unwrap();
        let rejection = axum::extract::Query::<Range>::try_from_uri(&uri).unwrap_err();
        let errors = malformed(rejection.into());

        assert_eq!(errors, vec![FieldError { message: "Campo obrigatório".into(), path: vec![json!("toDate")] }]);
    }

    #[test]
    fn syntax_errors_are_bad_requests() {
        let rejection = Json::<FeedbackBody>::from_bytes(b"{nope").unwrap_err();
        let resp = AppError::from(rejection).into_response();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(AppError::not_found("Lead").into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Duplicate("x".into()).into_response().status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InvalidDateRange("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::InvalidToken.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::InternalServerError(anyhow::anyhow!("boom")).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
