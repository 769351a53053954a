use async_trait::async_trait;
use modernblog_types::{
    NO_ROWS_CODE, NewPostRow, NewProfileRow, PostListRow, PostWithAuthorRow, ProfileRow,
    RestErrorPayload,
};
use reqwest::{Response, StatusCode, header};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::application::repos::{PostsRepo, ProfilesRepo, RepoError};
use crate::domain::entities::{
    Author, NewPost, NewProfile, PostSummary, PostVisibility, PostWithAuthor, Profile,
};

use super::{BackendClient, BackendError, Service, decode_json};

const POSTS_TABLE: &str = "posts";
const PROFILES_TABLE: &str = "profiles";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const RETURN_MINIMAL: &str = "return=minimal";
const NEWEST_FIRST: &str = "created_at.desc";

async fn rest_failure(response: Response) -> BackendError {
    let status = response.status();
    let payload = match response.bytes().await {
        Ok(bytes) => serde_json::from_slice::<RestErrorPayload>(&bytes).unwrap_or_default(),
        Err(err) => return BackendError::Transport(err),
    };
    let message = payload
        .message
        .unwrap_or_else(|| format!("data service returned {status}"));
    BackendError::Remote {
        status,
        code: payload.code,
        message,
    }
}

fn into_post_with_author(row: PostWithAuthorRow) -> Result<PostWithAuthor, RepoError> {
    let embed = row.profiles.ok_or_else(|| {
        RepoError::integrity(format!(
            "post {} references author {} without a readable profile",
            row.id, row.author_id
        ))
    })?;

    Ok(PostWithAuthor {
        id: row.id,
        title: row.title,
        content: row.content,
        author: Author {
            id: row.author_id,
            username: embed.username,
            avatar_url: embed.avatar_url,
        },
        created_at: row.created_at,
        published: row.published,
    })
}

fn into_profile(row: ProfileRow) -> Profile {
    Profile {
        id: row.id,
        username: row.username,
        full_name: row.full_name,
        avatar_url: row.avatar_url,
        created_at: row.created_at,
    }
}

impl BackendClient {
    async fn select_many<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
        bearer: Option<&str>,
    ) -> Result<Vec<T>, BackendError> {
        let url = self.rest_url(table, query)?;
        let request = self.authorize(self.http.get(url), bearer);
        let response = self.send(Service::Rest, request).await?;
        if !response.status().is_success() {
            return Err(rest_failure(response).await);
        }
        decode_json(response).await
    }

    /// Fetch at most one row; "no row" comes back as `None` rather than an error.
    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
        bearer: Option<&str>,
    ) -> Result<Option<T>, BackendError> {
        let url = self.rest_url(table, query)?;
        let request = self
            .authorize(self.http.get(url), bearer)
            .header(header::ACCEPT, SINGLE_OBJECT);
        let response = self.send(Service::Rest, request).await?;

        if response.status().is_success() {
            return decode_json(response).await.map(Some);
        }
        match rest_failure(response).await {
            BackendError::Remote {
                status: StatusCode::NOT_ACCEPTABLE,
                code: Some(code),
                ..
            } if code == NO_ROWS_CODE => Ok(None),
            other => Err(other),
        }
    }

    async fn insert<T: serde::Serialize + Sync>(
        &self,
        table: &str,
        row: &T,
        bearer: Option<&str>,
    ) -> Result<(), BackendError> {
        let url = self.rest_url(table, &[])?;
        let request = self
            .authorize(self.http.post(url), bearer)
            .header("Prefer", RETURN_MINIMAL)
            .json(row);
        let response = self.send(Service::Rest, request).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(rest_failure(response).await)
        }
    }
}

#[async_trait]
impl PostsRepo for BackendClient {
    async fn list_published(&self) -> Result<Vec<PostWithAuthor>, RepoError> {
        let rows: Vec<PostWithAuthorRow> = self
            .select_many(
                POSTS_TABLE,
                &[
                    ("select", PostWithAuthorRow::select()),
                    ("published", "eq.true".to_string()),
                    ("order", NEWEST_FIRST.to_string()),
                ],
                None,
            )
            .await?;

        rows.into_iter().map(into_post_with_author).collect()
    }

    async fn find_with_author(
        &self,
        id: Uuid,
        bearer: Option<&str>,
    ) -> Result<Option<PostWithAuthor>, RepoError> {
        let row: Option<PostWithAuthorRow> = self
            .select_one(
                POSTS_TABLE,
                &[
                    ("select", PostWithAuthorRow::select()),
                    ("id", format!("eq.{id}")),
                ],
                bearer,
            )
            .await?;

        row.map(into_post_with_author).transpose()
    }

    async fn list_by_author(
        &self,
        author_id: Uuid,
        visibility: PostVisibility,
        bearer: Option<&str>,
    ) -> Result<Vec<PostSummary>, RepoError> {
        let mut query = vec![
            ("select", PostListRow::SELECT.to_string()),
            ("author_id", format!("eq.{author_id}")),
            ("order", NEWEST_FIRST.to_string()),
        ];
        if visibility == PostVisibility::PublishedOnly {
            query.push(("published", "eq.true".to_string()));
        }

        let rows: Vec<PostListRow> = self.select_many(POSTS_TABLE, &query, bearer).await?;
        Ok(rows
            .into_iter()
            .filter(|row| visibility.admits(row.published))
            .map(|row| PostSummary {
                id: row.id,
                title: row.title,
                created_at: row.created_at,
                published: row.published,
            })
            .collect())
    }

    async fn create_post(&self, post: NewPost, bearer: &str) -> Result<(), RepoError> {
        let row = NewPostRow {
            title: post.title,
            content: post.content,
            author_id: post.author_id,
            published: true,
        };
        self.insert(POSTS_TABLE, &row, Some(bearer)).await?;
        Ok(())
    }
}

#[async_trait]
impl ProfilesRepo for BackendClient {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, RepoError> {
        let row: Option<ProfileRow> = self
            .select_one(
                PROFILES_TABLE,
                &[
                    ("select", ProfileRow::SELECT.to_string()),
                    ("id", format!("eq.{id}")),
                ],
                None,
            )
            .await?;
        Ok(row.map(into_profile))
    }

    async fn create_profile(
        &self,
        profile: NewProfile,
        bearer: Option<&str>,
    ) -> Result<(), RepoError> {
        let row = NewProfileRow {
            id: profile.id,
            username: profile.username,
            full_name: profile.full_name,
        };
        self.insert(PROFILES_TABLE, &row, bearer).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::MockServer;
    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::config::BackendSettings;

    const AUTHOR_ID: &str = "0b7f5a1e-6a51-4c4b-9a4f-3f5c2e1d0a99";
    const POST_ID: &str = "4a0c1f8e-2f0e-4d53-9d4c-0d6c1f6a8b11";

    fn client(server: &MockServer) -> BackendClient {
        BackendClient::new(&BackendSettings {
            url: Url::parse(&server.base_url()).expect("url"),
            anon_key: "anon-key".to_string(),
            timeout: Duration::from_secs(2),
        })
        .expect("client")
    }

    fn uuid(raw: &str) -> Uuid {
        Uuid::parse_str(raw).expect("uuid")
    }

    #[tokio::test]
    async fn listing_requests_published_posts_newest_first() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET")
                .path("/rest/v1/posts")
                .query_param("published", "eq.true")
                .query_param("order", "created_at.desc")
                .query_param("select", PostWithAuthorRow::select())
                .header("apikey", "anon-key")
                .header("authorization", "Bearer anon-key");
            then.status(200).json_body(json!([
                {
                    "id": POST_ID,
                    "title": "Hello",
                    "content": "<p>World</p>",
                    "author_id": AUTHOR_ID,
                    "created_at": "2024-03-05T10:15:30+00:00",
                    "published": true,
                    "profiles": {"username": "ada", "avatar_url": null}
                }
            ]));
        });

        let posts = client(&server).list_published().await.expect("posts");
        mock.assert();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author.username, "ada");
        assert_eq!(posts[0].author.id, uuid(AUTHOR_ID));
    }

    #[tokio::test]
    async fn missing_author_embed_is_an_integrity_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/rest/v1/posts");
            then.status(200).json_body(json!([
                {
                    "id": POST_ID,
                    "title": "Hello",
                    "content": "<p>World</p>",
                    "author_id": AUTHOR_ID,
                    "created_at": "2024-03-05T10:15:30+00:00",
                    "published": true,
                    "profiles": null
                }
            ]));
        });

        let err = client(&server).list_published().await.expect_err("orphan");
        assert!(matches!(err, RepoError::Integrity { .. }));
    }

    #[tokio::test]
    async fn schema_mismatch_is_a_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/rest/v1/posts");
            then.status(200).json_body(json!([{"id": "not-a-uuid"}]));
        });

        let err = client(&server).list_published().await.expect_err("bad row");
        assert!(matches!(err, RepoError::Decode(_)));
    }

    #[tokio::test]
    async fn single_post_without_row_is_none() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET")
                .path("/rest/v1/posts")
                .query_param("id", format!("eq.{POST_ID}"))
                .header("accept", SINGLE_OBJECT);
            then.status(406).json_body(json!({
                "code": "PGRST116",
                "message": "JSON object requested, multiple (or no) rows returned",
                "details": "The result contains 0 rows",
                "hint": null
            }));
        });

        let found = client(&server)
            .find_with_author(uuid(POST_ID), None)
            .await
            .expect("query ok");
        mock.assert();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn rejected_query_keeps_backend_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/rest/v1/posts");
            then.status(400).json_body(json!({
                "code": "42703",
                "message": "column posts.titel does not exist"
            }));
        });

        let err = client(&server)
            .find_with_author(uuid(POST_ID), None)
            .await
            .expect_err("rejected");
        assert_eq!(err.to_string(), "column posts.titel does not exist");
    }

    #[tokio::test]
    async fn author_listing_for_visitors_filters_drafts() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET")
                .path("/rest/v1/posts")
                .query_param("author_id", format!("eq.{AUTHOR_ID}"))
                .query_param("published", "eq.true");
            then.status(200).json_body(json!([]));
        });

        let posts = client(&server)
            .list_by_author(uuid(AUTHOR_ID), PostVisibility::PublishedOnly, None)
            .await
            .expect("posts");
        mock.assert();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn author_listing_for_owner_keeps_drafts() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET")
                .path("/rest/v1/posts")
                .query_param("author_id", format!("eq.{AUTHOR_ID}"))
                .header("authorization", "Bearer user-token");
            then.status(200).json_body(json!([
                {"id": POST_ID, "title": "Draft", "created_at": "2024-03-06T08:00:00Z", "published": false}
            ]));
        });

        let posts = client(&server)
            .list_by_author(
                uuid(AUTHOR_ID),
                PostVisibility::IncludeDrafts,
                Some("user-token"),
            )
            .await
            .expect("posts");
        mock.assert();
        assert_eq!(posts.len(), 1);
        assert!(!posts[0].published);
    }

    #[tokio::test]
    async fn create_post_sends_published_row_with_user_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST")
                .path("/rest/v1/posts")
                .header("prefer", "return=minimal")
                .header("authorization", "Bearer user-token")
                .json_body(json!({
                    "title": "Hello",
                    "content": "<p>World</p>",
                    "author_id": AUTHOR_ID,
                    "published": true
                }));
            then.status(201);
        });

        client(&server)
            .create_post(
                NewPost {
                    title: "Hello".into(),
                    content: "<p>World</p>".into(),
                    author_id: uuid(AUTHOR_ID),
                },
                "user-token",
            )
            .await
            .expect("created");
        mock.assert();
    }

    #[tokio::test]
    async fn profile_lookup_maps_row() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET")
                .path("/rest/v1/profiles")
                .query_param("id", format!("eq.{AUTHOR_ID}"));
            then.status(200).json_body(json!({
                "id": AUTHOR_ID,
                "username": "ada",
                "full_name": "Ada Lovelace",
                "avatar_url": null,
                "created_at": "2024-01-01T00:00:00Z"
            }));
        });

        let profile = client(&server)
            .find_profile(uuid(AUTHOR_ID))
            .await
            .expect("query ok")
            .expect("profile");
        assert_eq!(profile.full_name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected_with_backend_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/rest/v1/profiles");
            then.status(409).json_body(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint \"profiles_username_key\""
            }));
        });

        let err = client(&server)
            .create_profile(
                NewProfile {
                    id: uuid(AUTHOR_ID),
                    username: "ada".into(),
                    full_name: "Ada Lovelace".into(),
                },
                None,
            )
            .await
            .expect_err("conflict");
        match err {
            RepoError::Rejected { status, code, .. } => {
                assert_eq!(status, 409);
                assert_eq!(code.as_deref(), Some("23505"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
