//! Twitter API v2 client.
//!
//! Uses the recent-search and tweet-lookup endpoints with OAuth 1.0a request
//! signing, and tracks rate-limit headers so the poller can back off.

use crate::models::Post;
use crate::twitter::oauth::{generate_oauth_header, percent_encode, TwitterCredentials};
use crate::twitter::{PlatformError, SocialPlatform};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

const TWITTER_API_BASE: &str = "https://api.twitter.com/2";

/// Maximum characters per post for non-premium accounts.
pub const POST_MAX_CHARS: usize = 280;

/// The recent-search endpoint rejects max_results below 10.
const SEARCH_MIN_RESULTS: usize = 10;

const TWEET_FIELDS: &str =
    "author_id,conversation_id,created_at,in_reply_to_user_id,referenced_tweets,attachments";
const EXPANSIONS: &str = "author_id,attachments.media_keys";
const USER_FIELDS: &str = "username";
const MEDIA_FIELDS: &str = "media_key,type,url,preview_image_url";

pub struct TwitterClient {
    client: reqwest::Client,
    credentials: TwitterCredentials,
    self_user_id: String,
    self_handle: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<Vec<ApiTweet>>,
    includes: Option<Includes>,
    errors: Option<Vec<ApiError>>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    data: Option<ApiTweet>,
    includes: Option<Includes>,
}

#[derive(Debug, Deserialize)]
struct ApiTweet {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<String>,
    conversation_id: Option<String>,
    in_reply_to_user_id: Option<String>,
    referenced_tweets: Option<Vec<ReferencedTweet>>,
    attachments: Option<Attachments>,
}

#[derive(Debug, Deserialize)]
struct ReferencedTweet {
    #[serde(rename = "type")]
    ref_type: String,
    id: String,
}

#[derive(Debug, Deserialize)]
struct Attachments {
    media_keys: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Includes {
    users: Option<Vec<ApiUser>>,
    media: Option<Vec<ApiMedia>>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct ApiMedia {
    media_key: String,
    #[serde(rename = "type")]
    media_type: String,
    url: Option<String>,
    preview_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SingleUserResponse {
    data: Option<ApiSelfUser>,
}

#[derive(Debug, Deserialize)]
struct ApiSelfUser {
    username: String,
}

#[derive(Debug, Deserialize)]
struct PostTweetResponse {
    data: Option<PostedTweet>,
    errors: Option<Vec<ApiError>>,
}

#[derive(Debug, Deserialize)]
struct PostedTweet {
    id: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl TwitterClient {
    pub fn new(credentials: TwitterCredentials, self_user_id: &str, self_handle: &str) -> Self {
        TwitterClient {
            client: crate::http::shared_client().clone(),
            credentials,
            self_user_id: self_user_id.to_string(),
            self_handle: self_handle.to_string(),
        }
    }

    /// Verify credentials by fetching the authenticated user. Returns the
    /// account's username.
    pub async fn verify_credentials(&self) -> Result<String, PlatformError> {
        let url = format!("{}/users/me", TWITTER_API_BASE);
        let auth_header = generate_oauth_header("GET", &url, &self.credentials, None);

        let response = self
            .client
            .get(&url)
            .header("Authorization", auth_header)
            .send()
            .await
            .map_err(|e| PlatformError::new(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(PlatformError::new(format!("API error ({}): {}", status, body)));
        }

        let data: SingleUserResponse = serde_json::from_str(&body)
            .map_err(|e| PlatformError::new(format!("Failed to parse response: {}", e)))?;
        data.data
            .map(|user| user.username)
            .ok_or_else(|| PlatformError::new("No user data returned"))
    }

    async fn get_signed(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<String, PlatformError> {
        let query_string: String = params
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let full_url = if query_string.is_empty() {
            url.to_string()
        } else {
            format!("{}?{}", url, query_string)
        };

        // Query params must be included in the OAuth signature
        let auth_header = generate_oauth_header("GET", url, &self.credentials, Some(params));

        let response = self
            .client
            .get(&full_url)
            .header("Authorization", auth_header)
            .send()
            .await
            .map_err(|e| PlatformError::new(format!("Request failed: {}", e)))?;

        let status = response.status();
        let reset_secs = seconds_until_rate_limit_reset(&response);
        let body = response.text().await.unwrap_or_default();

        log::debug!("Twitter GET {} -> {}", url, status);

        if status.as_u16() == 429 {
            return Err(PlatformError::rate_limited(
                format!("API rate limited ({}): {}", status, body),
                reset_secs,
            ));
        }
        if !status.is_success() {
            return Err(PlatformError::new(format!("API error ({}): {}", status, body)));
        }

        Ok(body)
    }

    async fn post_single(
        &self,
        text: &str,
        reply_to_id: Option<&str>,
    ) -> Result<PostedTweet, PlatformError> {
        let url = format!("{}/tweets", TWITTER_API_BASE);
        let auth_header = generate_oauth_header("POST", &url, &self.credentials, None);

        let mut body = serde_json::json!({ "text": text });
        if let Some(reply_to) = reply_to_id {
            body["reply"] = serde_json::json!({ "in_reply_to_tweet_id": reply_to });
        }

        let response = self
            .client
            .post(&url)
            .header("Authorization", auth_header)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PlatformError::new(format!("Request failed: {}", e)))?;

        let status = response.status();
        let reset_secs = seconds_until_rate_limit_reset(&response);
        let response_body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            return Err(PlatformError::rate_limited(
                format!("API rate limited ({}): {}", status, response_body),
                reset_secs,
            ));
        }
        if !status.is_success() {
            return Err(PlatformError::new(format!(
                "API error ({}): {}",
                status, response_body
            )));
        }

        let data: PostTweetResponse = serde_json::from_str(&response_body)
            .map_err(|e| PlatformError::new(format!("Failed to parse response: {}", e)))?;

        if let Some(errors) = data.errors {
            let error_msg = errors
                .iter()
                .map(|e| e.message.clone())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(PlatformError::new(format!("Twitter API errors: {}", error_msg)));
        }

        data.data
            .ok_or_else(|| PlatformError::new("No tweet data returned"))
    }
}

#[async_trait]
impl SocialPlatform for TwitterClient {
    async fn search_posts(&self, query: &str, limit: usize) -> Result<Vec<Post>, PlatformError> {
        let url = format!("{}/tweets/search/recent", TWITTER_API_BASE);
        let max_results = limit.clamp(SEARCH_MIN_RESULTS, 100).to_string();
        let params: Vec<(&str, &str)> = vec![
            ("query", query),
            ("tweet.fields", TWEET_FIELDS),
            ("expansions", EXPANSIONS),
            ("user.fields", USER_FIELDS),
            ("media.fields", MEDIA_FIELDS),
            ("max_results", &max_results),
        ];

        let body = self.get_signed(&url, &params).await?;
        let data: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| PlatformError::new(format!("Failed to parse response: {}", e)))?;

        if let Some(errors) = data.errors {
            let error_msg = errors
                .iter()
                .map(|e| e.message.clone())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(PlatformError::new(format!("Twitter API errors: {}", error_msg)));
        }

        let (users, media) = index_includes(data.includes);
        let posts = data
            .data
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(|t| to_post(t, &users, &media))
            .collect();
        Ok(posts)
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, PlatformError> {
        let url = format!("{}/tweets/{}", TWITTER_API_BASE, id);
        let params: Vec<(&str, &str)> = vec![
            ("tweet.fields", TWEET_FIELDS),
            ("expansions", EXPANSIONS),
            ("user.fields", USER_FIELDS),
            ("media.fields", MEDIA_FIELDS),
        ];

        let body = match self.get_signed(&url, &params).await {
            Ok(body) => body,
            Err(e) if e.message.contains("(404") => return Ok(None),
            Err(e) => return Err(e),
        };

        let data: LookupResponse = serde_json::from_str(&body)
            .map_err(|e| PlatformError::new(format!("Failed to parse response: {}", e)))?;

        let (users, media) = index_includes(data.includes);
        Ok(data.data.map(|t| to_post(t, &users, &media)))
    }

    async fn publish_reply(
        &self,
        text: &str,
        in_reply_to: &str,
    ) -> Result<Vec<Post>, PlatformError> {
        let chunks = split_for_post(text, POST_MAX_CHARS);
        let mut last_id = in_reply_to.to_string();
        let mut posted = Vec::with_capacity(chunks.len());

        for (i, chunk) in chunks.iter().enumerate() {
            log::info!(
                "Twitter: posting reply chunk {}/{} ({} chars)",
                i + 1,
                chunks.len(),
                chunk.chars().count()
            );
            let tweet = self.post_single(chunk, Some(&last_id)).await?;
            last_id = tweet.id.clone();
            posted.push(Post {
                id: tweet.id,
                author_id: self.self_user_id.clone(),
                author_handle: self.self_handle.clone(),
                text: tweet.text,
                created_at_epoch: chrono::Utc::now().timestamp(),
                conversation_id: None,
                in_reply_to_id: Some(in_reply_to.to_string()),
                is_reply: true,
                is_retweet: false,
                image_urls: Vec::new(),
            });
        }

        Ok(posted)
    }
}

fn seconds_until_rate_limit_reset(response: &reqwest::Response) -> Option<u64> {
    let reset_at: u64 = response
        .headers()
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())?;
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Some(reset_at.saturating_sub(now))
}

fn index_includes(
    includes: Option<Includes>,
) -> (HashMap<String, String>, HashMap<String, ApiMedia>) {
    let mut users = HashMap::new();
    let mut media = HashMap::new();
    if let Some(includes) = includes {
        for user in includes.users.unwrap_or_default() {
            users.insert(user.id, user.username);
        }
        for item in includes.media.unwrap_or_default() {
            media.insert(item.media_key.clone(), item);
        }
    }
    (users, media)
}

fn to_post(
    tweet: ApiTweet,
    users: &HashMap<String, String>,
    media: &HashMap<String, ApiMedia>,
) -> Post {
    let author_id = tweet.author_id.unwrap_or_default();
    let author_handle = users
        .get(&author_id)
        .cloned()
        .unwrap_or_else(|| format!("user_{}", author_id));

    let mut in_reply_to_id = None;
    let mut is_retweet = false;
    for referenced in tweet.referenced_tweets.unwrap_or_default() {
        match referenced.ref_type.as_str() {
            "replied_to" => in_reply_to_id = Some(referenced.id),
            "retweeted" | "quoted" => is_retweet = true,
            _ => {}
        }
    }
    let is_reply = in_reply_to_id.is_some() || tweet.in_reply_to_user_id.is_some();

    let image_urls = tweet
        .attachments
        .and_then(|a| a.media_keys)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|key| media.get(&key))
        .filter(|m| m.media_type == "photo")
        .filter_map(|m| m.url.clone().or_else(|| m.preview_image_url.clone()))
        .collect();

    let created_at_epoch = tweet
        .created_at
        .as_deref()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.timestamp())
        .unwrap_or(0);

    Post {
        id: tweet.id,
        author_id,
        author_handle,
        text: tweet.text,
        created_at_epoch,
        conversation_id: tweet.conversation_id,
        in_reply_to_id,
        is_reply,
        is_retweet,
        image_urls,
    }
}

/// Split a reply into post-sized chunks for threading.
pub fn split_for_post(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    // Reserve space for the thread indicator (e.g. " 1/3")
    let max_chunk_chars = max_chars.saturating_sub(5);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate_len = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if candidate_len > max_chunk_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            if word.chars().count() > max_chunk_chars {
                // Single word exceeds the limit, truncate it
                let truncated: String = word.chars().take(max_chunk_chars - 3).collect();
                chunks.push(format!("{}...", truncated));
                continue;
            }
            current = word.to_string();
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| format!("{} {}/{}", chunk, i + 1, total))
        .collect()
}
