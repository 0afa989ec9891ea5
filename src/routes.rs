use std::convert::Infallible;

use serde::{Deserialize, Serialize};
use tracing::error;
use warp::{http::StatusCode, path, reply, Filter, Rejection, Reply};

use crate::{
    auth::Auth,
    bearer::bearer_token,
    error::AuthError,
    types::{TokenStatus, UserView, Username},
};

pub fn build_api_route_filter(
    auth: &Auth,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let register = path!("register")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_auth_state(auth.clone()))
        .and_then(user_register);

    let login = path!("login")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_auth_state(auth.clone()))
        .and_then(user_login);

    let verify_token = path!("verifyToken")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_auth_state(auth.clone()))
        .and_then(token_verify);

    let details = path!("details")
        .and(warp::get())
        .and(with_auth(auth))
        .and(with_auth_state(auth.clone()))
        .and_then(user_details);

    register.or(login).or(verify_token).or(details)
}

/// Gate a route behind a valid bearer token; extracts the token's username.
pub fn with_auth(auth: &Auth) -> impl Filter<Extract = (Username,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_auth_state(auth.clone()))
        .and_then(user_auth_check)
}

pub async fn handle_auth_errors(err: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(auth_error) = err.find::<AuthError>() {
        let message = if auth_error.is_internal() {
            error!(error = ?auth_error, "request failed");
            "internal server error".to_string()
        } else {
            auth_error.to_string()
        };

        return Ok(reply::with_status(
            reply::json(&ErrorResponse { message }),
            status_for(auth_error),
        ));
    }

    Err(err)
}

pub fn status_for(error: &AuthError) -> StatusCode {
    match error {
        AuthError::AlreadyExists => StatusCode::CONFLICT,
        AuthError::NotFound => StatusCode::NOT_FOUND,
        AuthError::MissingInput(_) => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials | AuthError::Unauthenticated | AuthError::InvalidToken => {
            StatusCode::UNAUTHORIZED
        }
        AuthError::DatabaseError { .. }
        | AuthError::HashingError { .. }
        | AuthError::SigningError { .. }
        | AuthError::TaskError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

// Missing fields deserialize as empty so the service reports them as missing
// input instead of warp rejecting the body.
#[derive(Debug, Deserialize)]
pub struct CredentialsQuery {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub data: UserView,
}

async fn user_register(input: CredentialsQuery, auth: Auth) -> Result<impl Reply, Rejection> {
    let user = auth.register(&input.username, &input.password).await?;

    Ok(reply::with_status(
        reply::json(&RegisterResponse {
            message: "user created successfully",
            data: user,
        }),
        StatusCode::CREATED,
    ))
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub data: UserView,
    pub token: String,
}

async fn user_login(input: CredentialsQuery, auth: Auth) -> Result<impl Reply, Rejection> {
    let outcome = auth.login(&input.username, &input.password).await?;

    Ok(reply::json(&LoginResponse {
        message: "user logged in successfully",
        data: outcome.user,
        token: outcome.token,
    }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyTokenQuery {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyTokenResponse {
    pub message: &'static str,
    pub data: TokenStatus,
}

async fn token_verify(input: VerifyTokenQuery, auth: Auth) -> Result<impl Reply, Rejection> {
    let status = auth.verify_token(&input.token).await?;

    Ok(reply::json(&VerifyTokenResponse {
        message: "token is valid",
        data: status,
    }))
}

#[derive(Debug, Serialize)]
pub struct DetailsResponse {
    pub data: UserView,
}

async fn user_details(username: Username, auth: Auth) -> Result<impl Reply, Rejection> {
    let user = auth.get_details(&username).await?;

    Ok(reply::json(&DetailsResponse { data: user }))
}

// Unwrap the bearer token and validate it
async fn user_auth_check(header: Option<String>, auth: Auth) -> Result<Username, Rejection> {
    let username = auth
        .authenticate_request(bearer_token(header.as_deref()))
        .await?;

    Ok(username)
}

// functor that adds a handle to the auth service into the filter chain
fn with_auth_state(auth: Auth) -> impl Filter<Extract = (Auth,), Error = Infallible> + Clone {
    warp::any().map(move || auth.clone())
}
