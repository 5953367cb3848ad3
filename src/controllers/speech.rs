use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    domain::speech::{SpeechIdentity, SpeechRequest, SpeechService},
    error::{AppError, AppResult},
    infrastructure::auth::AuthUser,
};

const MAX_TEXT_LENGTH: usize = 10_000;

pub struct SpeechController {
    speech_service: Arc<SpeechService>,
}

impl SpeechController {
    pub fn new(speech_service: Arc<SpeechService>) -> Self {
        Self { speech_service }
    }

    /// POST /api/speech - Convert text to speech. Anonymous callers are
    /// served with a tighter concurrency limit.
    pub async fn synthesize(
        State(controller): State<Arc<SpeechController>>,
        auth_user: Option<Extension<AuthUser>>,
        Json(request): Json<SpeechRequest>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        if request.text.is_empty() {
            return Err(AppError::BadRequest("Text cannot be empty".to_string()));
        }
        if request.text.len() > MAX_TEXT_LENGTH {
            return Err(AppError::PayloadTooLarge(format!(
                "Text must be {} characters or less",
                MAX_TEXT_LENGTH
            )));
        }

        let identity = match auth_user {
            Some(Extension(user)) => SpeechIdentity::User {
                id: user.user_id,
                email: user.email,
            },
            None => SpeechIdentity::Anonymous,
        };

        let audio = controller
            .speech_service
            .synthesize(&identity, request)
            .await
            .map_err(AppError::from)?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "audio/mp3".parse().unwrap());
        headers.insert(
            header::CONTENT_LENGTH,
            audio.len().to_string().parse().unwrap(),
        );
        // Identical input yields identical audio for a day
        headers.insert(
            header::CACHE_CONTROL,
            "public, max-age=86400".parse().unwrap(),
        );

        Ok((StatusCode::OK, headers, Body::from(audio)))
    }
}
