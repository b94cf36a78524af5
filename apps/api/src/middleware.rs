use std::str::FromStr;

use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tessera_core::{AppError, AppResult, CompanyId, UserId, UserIdentity};

use crate::error::ApiResult;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const COMPANY_ID_HEADER: &str = "x-company-id";
pub const USER_NAME_HEADER: &str = "x-user-name";

/// Resolves the acting user from headers set by the authenticating proxy.
pub async fn require_actor(mut request: Request, next: Next) -> ApiResult<Response> {
    let identity = actor_from_headers(request.headers())?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

pub fn actor_from_headers(headers: &HeaderMap) -> AppResult<UserIdentity> {
    let user_id = header_text(headers, USER_ID_HEADER)?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;
    let user_id = UserId::from_str(user_id)
        .map_err(|_| AppError::Unauthorized(format!("invalid {USER_ID_HEADER} header")))?;

    let company_id = header_text(headers, COMPANY_ID_HEADER)?
        .map(|value| {
            CompanyId::from_str(value)
                .map_err(|_| AppError::Unauthorized(format!("invalid {COMPANY_ID_HEADER} header")))
        })
        .transpose()?;

    let display_name = header_text(headers, USER_NAME_HEADER)?
        .map(str::to_owned)
        .unwrap_or_else(|| user_id.to_string());

    Ok(UserIdentity::new(user_id, display_name, company_id))
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> AppResult<Option<&'a str>> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthorized(format!("{name} header must be visible ASCII")))?
        .trim();

    Ok((!value.is_empty()).then_some(value))
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};
    use tessera_core::{AppError, CompanyId, UserId};

    use super::{COMPANY_ID_HEADER, USER_ID_HEADER, USER_NAME_HEADER, actor_from_headers};

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(
                *name,
                HeaderValue::from_str(value).unwrap_or_else(|_| unreachable!()),
            );
        }
        headers
    }

    #[test]
    fn missing_user_header_is_unauthorized() {
        let result = actor_from_headers(&HeaderMap::new());
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn malformed_identifiers_are_unauthorized() {
        let user_id = UserId::new().to_string();
        for pairs in [
            vec![(USER_ID_HEADER, "not-a-uuid")],
            vec![(USER_ID_HEADER, user_id.as_str()), (COMPANY_ID_HEADER, "acme")],
        ] {
            assert!(matches!(
                actor_from_headers(&headers(&pairs)),
                Err(AppError::Unauthorized(_))
            ));
        }
    }

    #[test]
    fn actor_carries_optional_company_scope() {
        let user_id = UserId::new();
        let company_id = CompanyId::new();
        let user_text = user_id.to_string();
        let company_text = company_id.to_string();

        let global = actor_from_headers(&headers(&[(USER_ID_HEADER, user_text.as_str())]))
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(global.user_id(), user_id);
        assert_eq!(global.company_id(), None);
        assert_eq!(global.display_name(), user_text);

        let scoped = actor_from_headers(&headers(&[
            (USER_ID_HEADER, user_text.as_str()),
            (COMPANY_ID_HEADER, company_text.as_str()),
            (USER_NAME_HEADER, "Ada"),
        ]))
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(scoped.company_id(), Some(company_id));
        assert_eq!(scoped.display_name(), "Ada");
    }
}
