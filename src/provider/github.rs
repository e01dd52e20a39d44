//! GitHub REST implementation of [`ReleaseSource`].

use async_trait::async_trait;
use log::debug;

use reqwest::Url;

use crate::http::{FetchError, HttpClient};

use super::{Release, ReleaseAsset, ReleaseSource, RepoId, Tag};

/// GitHub API response types (internal).
mod api {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct Release {
        pub tag_name: String,
        pub name: Option<String>,
        pub published_at: Option<String>,
        #[serde(default)]
        pub html_url: String,
        #[serde(default)]
        pub assets: Vec<Asset>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Asset {
        pub name: String,
        #[serde(default)]
        pub size: u64,
        pub browser_download_url: String,
    }

    #[derive(Deserialize, Debug)]
    pub struct Tag {
        pub name: String,
    }
}

pub struct GitHubProvider {
    http_client: HttpClient,
    api_url: String,
}

impl GitHubProvider {
    pub fn new(http_client: HttpClient, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn releases_url(&self, repo: &RepoId) -> String {
        format!("{}/repos/{}/{}/releases", self.api_url, repo.owner, repo.repo)
    }

    fn tags_url(&self, repo: &RepoId) -> String {
        format!("{}/repos/{}/{}/tags", self.api_url, repo.owner, repo.repo)
    }

    /// `.../releases/tags/<tag>` with the tag percent-encoded as one segment.
    fn release_tag_url(&self, repo: &RepoId, tag: &str) -> Result<String, FetchError> {
        let base = format!("{}/tags", self.releases_url(repo));
        let invalid = |message: String| FetchError::Transport {
            url: base.clone(),
            message,
        };

        let mut url = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("URL cannot carry a path".to_string()))?
            .push(tag);
        Ok(url.to_string())
    }
}

#[async_trait]
impl ReleaseSource for GitHubProvider {
    #[tracing::instrument(skip(self))]
    async fn releases(&self, repo: &RepoId, per_page: usize) -> Result<Vec<Release>, FetchError> {
        let url = self.releases_url(repo);
        debug!("Fetching {} releases from {}...", per_page, url);

        let query = vec![("per_page".to_string(), per_page.to_string())];
        let parsed: Vec<api::Release> = self.http_client.get_json(&url, Some(&query)).await?;

        Ok(parsed
            .into_iter()
            .map(|r| Release::from(r).without_assets())
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn all_releases(&self, repo: &RepoId) -> Result<Vec<Release>, FetchError> {
        let url = self.releases_url(repo);
        let params = vec![("per_page".to_string(), "100".to_string())];
        let items = self.http_client.paginate(&url, &params).await?;

        items
            .into_iter()
            .map(|item| {
                serde_json::from_value::<api::Release>(item)
                    .map(Release::from)
                    .map_err(|e| FetchError::decode(&url, e))
            })
            .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn release_by_tag(
        &self,
        repo: &RepoId,
        tag: &str,
    ) -> Result<Option<Release>, FetchError> {
        let url = self.release_tag_url(repo, tag)?;
        match self.http_client.get_json::<api::Release>(&url, None).await {
            Ok(release) => Ok(Some(release.into())),
            Err(e) if e.is_not_found() => {
                debug!("No release tagged {} in {}", tag, repo);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn tags(&self, repo: &RepoId) -> Result<Vec<Tag>, FetchError> {
        let url = self.tags_url(repo);
        let params = vec![("per_page".to_string(), "100".to_string())];
        let items = self.http_client.paginate(&url, &params).await?;

        items
            .into_iter()
            .map(|item| {
                serde_json::from_value::<api::Tag>(item)
                    .map(|t| Tag { name: t.name })
                    .map_err(|e| FetchError::decode(&url, e))
            })
            .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn download_text(&self, url: &str) -> Result<String, FetchError> {
        self.http_client.get_text(url).await
    }
}

impl From<api::Release> for Release {
    fn from(r: api::Release) -> Self {
        let assets: Vec<ReleaseAsset> = r.assets.into_iter().map(|a| a.into()).collect();
        let download_urls = assets.iter().map(|a| a.download_url.clone()).collect();
        Release {
            name: r.name.unwrap_or_default(),
            tag_name: r.tag_name,
            published_at: r.published_at,
            url: r.html_url,
            assets,
            download_urls,
        }
        .with_name_backfilled()
    }
}

impl From<api::Asset> for ReleaseAsset {
    fn from(a: api::Asset) -> Self {
        ReleaseAsset {
            name: a.name,
            download_url: a.browser_download_url,
            size: a.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use reqwest::Client;

    fn repo() -> RepoId {
        "octo/tool".parse().unwrap()
    }

    fn provider(url: &str) -> GitHubProvider {
        GitHubProvider::new(HttpClient::new(Client::new()), url)
    }

    fn release_json(tag: &str, asset: &str) -> String {
        format!(
            r#"{{"tag_name": "{tag}", "name": null, "published_at": "2024-05-01T10:00:00Z",
                "html_url": "https://github.com/octo/tool/releases/tag/{tag}",
                "assets": [{{"name": "{asset}", "size": 42,
                             "browser_download_url": "https://dl.example/{tag}/{asset}"}}]}}"#
        )
    }

    #[test]
    fn test_api_url_trailing_slash_trimmed() {
        let p = provider("https://api.example.com/");
        assert_eq!(p.api_url(), "https://api.example.com");
    }

    #[test]
    fn test_release_conversion() {
        let api_release = api::Release {
            tag_name: "v1.0.0".into(),
            name: Some("".into()),
            published_at: Some("2024-01-01T00:00:00Z".into()),
            html_url: "https://github.com/o/r/releases/tag/v1.0.0".into(),
            assets: vec![api::Asset {
                name: "tool-linux-amd64".into(),
                size: 1024,
                browser_download_url: "https://example.com/asset".into(),
            }],
        };

        let release: Release = api_release.into();
        assert_eq!(release.name, "v1.0.0");
        assert_eq!(release.url, "https://github.com/o/r/releases/tag/v1.0.0");
        assert_eq!(release.assets.len(), 1);
        assert_eq!(release.assets[0].download_url, "https://example.com/asset");
        assert_eq!(release.download_urls, vec!["https://example.com/asset"]);
    }

    #[tokio::test]
    async fn test_releases_sends_per_page_and_drops_assets() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/octo/tool/releases")
            .match_query(Matcher::UrlEncoded("per_page".into(), "5".into()))
            .with_status(200)
            .with_body(format!("[{}]", release_json("v1.0.0", "tool.tar.gz")))
            .create_async()
            .await;

        let releases = provider(&server.url()).releases(&repo(), 5).await.unwrap();

        mock.assert_async().await;
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].name, "v1.0.0");
        assert!(releases[0].assets.is_empty());
        assert!(releases[0].download_urls.is_empty());
    }

    #[tokio::test]
    async fn test_all_releases_walks_every_page() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let page1 = server
            .mock("GET", "/repos/octo/tool/releases")
            .match_query(Matcher::UrlEncoded("per_page".into(), "100".into()))
            .with_status(200)
            .with_header(
                "link",
                &format!(r#"<{url}/repositories/7/releases?page=2>; rel="next""#),
            )
            .with_body(format!(
                "[{}, {}]",
                release_json("v6", "a"),
                release_json("v5", "b")
            ))
            .expect(1)
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/repositories/7/releases")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_header(
                "link",
                &format!(r#"<{url}/repositories/7/releases?page=3>; rel="next""#),
            )
            .with_body(format!(
                "[{}, {}]",
                release_json("v4", "c"),
                release_json("v3", "d")
            ))
            .expect(1)
            .create_async()
            .await;
        let page3 = server
            .mock("GET", "/repositories/7/releases")
            .match_query(Matcher::UrlEncoded("page".into(), "3".into()))
            .with_status(200)
            .with_body(format!(
                "[{}, {}]",
                release_json("v2", "e"),
                release_json("v1", "f")
            ))
            .expect(1)
            .create_async()
            .await;

        let releases = provider(&url).all_releases(&repo()).await.unwrap();

        page1.assert_async().await;
        page2.assert_async().await;
        page3.assert_async().await;
        let tags: Vec<&str> = releases.iter().map(|r| r.tag_name.as_str()).collect();
        assert_eq!(tags, vec!["v6", "v5", "v4", "v3", "v2", "v1"]);
        assert_eq!(releases[0].download_urls, vec!["https://dl.example/v6/a"]);
    }

    #[tokio::test]
    async fn test_release_by_tag_not_found_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/octo/tool/releases/tags/v9.9.9")
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        let result = provider(&server.url())
            .release_by_tag(&repo(), "v9.9.9")
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_release_by_tag_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/octo/tool/releases/tags/v1.0.0")
            .with_status(200)
            .with_body(release_json("v1.0.0", "checksums.txt"))
            .create_async()
            .await;

        let release = provider(&server.url())
            .release_by_tag(&repo(), "v1.0.0")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(release.assets[0].name, "checksums.txt");
        assert_eq!(release.assets[0].size, 42);
    }

    #[tokio::test]
    async fn test_release_by_tag_encodes_tag_segment() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/octo/tool/releases/tags/v1.0%2Frc%231%3F")
            .with_status(200)
            .with_body(release_json("v1.0/rc#1?", "checksums.txt"))
            .expect(1)
            .create_async()
            .await;

        let release = provider(&server.url())
            .release_by_tag(&repo(), "v1.0/rc#1?")
            .await
            .unwrap()
            .unwrap();

        mock.assert_async().await;
        assert_eq!(release.tag_name, "v1.0/rc#1?");
    }

    #[test]
    fn test_release_tag_url_plain_tag_unchanged() {
        let p = provider("https://api.example.com");
        assert_eq!(
            p.release_tag_url(&repo(), "v1.2.3").unwrap(),
            "https://api.example.com/repos/octo/tool/releases/tags/v1.2.3"
        );
    }

    #[tokio::test]
    async fn test_tags_walks_every_page() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let page1 = server
            .mock("GET", "/repos/octo/tool/tags")
            .match_query(Matcher::UrlEncoded("per_page".into(), "100".into()))
            .with_status(200)
            .with_header(
                "link",
                &format!(r#"<{url}/repositories/7/tags?page=2>; rel="next""#),
            )
            .with_body(r#"[{"name": "2.15.0", "commit": {"sha": "a1"}}, {"name": "2.9.1"}]"#)
            .expect(1)
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/repositories/7/tags")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_body(r#"[{"name": "2.0.0"}]"#)
            .expect(1)
            .create_async()
            .await;

        let tags = provider(&url).tags(&repo()).await.unwrap();

        page1.assert_async().await;
        page2.assert_async().await;
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["2.15.0", "2.9.1", "2.0.0"]);
    }

    #[tokio::test]
    async fn test_release_by_tag_server_error_propagates() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/octo/tool/releases/tags/v1.0.0")
            .with_status(401)
            .create_async()
            .await;

        let err = provider(&server.url())
            .release_by_tag(&repo(), "v1.0.0")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
    }
}
