use crate::model::{Track, TrackKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub journalist: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastEpisode {
    pub id: String,
    pub title: String,
    pub audio_url: String,
    #[serde(default, rename = "duration")]
    pub duration_secs: Option<u64>,
    #[serde(default)]
    pub season_number: Option<u32>,
    #[serde(default)]
    pub episode_number: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Podcast {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub episodes: Vec<PodcastEpisode>,
}

impl Track {
    /// Articles without narrated audio are not playable.
    pub fn from_article(article: &Article) -> Option<Track> {
        let url = article.audio_url.as_deref().filter(|u| !u.trim().is_empty())?;
        let mut track = Track::new(&article.id, &article.title, url, TrackKind::Article);
        track.cover_image = article.cover_image.clone();
        track.category = article.category.clone();
        Some(track)
    }

    pub fn from_episode(podcast: &Podcast, episode: &PodcastEpisode) -> Track {
        let mut track = Track::new(
            &episode.id,
            &episode.title,
            &episode.audio_url,
            TrackKind::Podcast,
        );
        track.cover_image = podcast.cover_image.clone();
        track.category = podcast.category.clone();
        track.duration_hint_ms = episode.duration_secs.map(|s| s.saturating_mul(1_000));
        track
    }
}

/// Content the front end can offer for playback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub podcasts: Vec<Podcast>,
}

impl Catalog {
    pub fn track(&self, id: &str) -> Option<Track> {
        if let Some(article) = self.articles.iter().find(|a| a.id == id) {
            if let Some(track) = Track::from_article(article) {
                return Some(track);
            }
        }
        self.podcasts.iter().find_map(|podcast| {
            podcast
                .episodes
                .iter()
                .find(|e| e.id == id)
                .map(|episode| Track::from_episode(podcast, episode))
        })
    }

    pub fn tracks(&self) -> Vec<Track> {
        let articles = self.articles.iter().filter_map(Track::from_article);
        let episodes = self.podcasts.iter().flat_map(|podcast| {
            podcast
                .episodes
                .iter()
                .map(move |episode| Track::from_episode(podcast, episode))
        });
        articles.chain(episodes).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Catalog;
    use crate::model::TrackKind;

    const CATALOG: &str = r#"{
        "articles": [
            {
                "id": "1",
                "title": "Climate and farming",
                "coverImage": "https://example.com/a1.jpg",
                "category": "Society",
                "audioUrl": "https://example.com/a1.mp3"
            },
            { "id": "2", "title": "Text only" }
        ],
        "podcasts": [
            {
                "id": "p1",
                "title": "Voices",
                "coverImage": "https://example.com/p1.jpg",
                "episodes": [
                    { "id": "1-1", "title": "Episode one", "audioUrl": "https://example.com/e1.mp3", "duration": 2400 }
                ]
            }
        ]
    }"#;

    #[test]
    fn resolves_articles_and_episodes_by_id() {
        let catalog: Catalog = serde_json::from_str(CATALOG).unwrap();

        let article = catalog.track("1").unwrap();
        assert_eq!(article.kind, TrackKind::Article);
        assert_eq!(article.category.as_deref(), Some("Society"));

        let episode = catalog.track("1-1").unwrap();
        assert_eq!(episode.kind, TrackKind::Podcast);
        assert_eq!(episode.cover_image.as_deref(), Some("https://example.com/p1.jpg"));
        assert_eq!(episode.duration_hint_ms, Some(2_400_000));

        assert!(catalog.track("2").is_none());
        assert!(catalog.track("missing").is_none());
    }

    #[test]
    fn lists_only_playable_items() {
        let catalog: Catalog = serde_json::from_str(CATALOG).unwrap();
        let ids: Vec<String> = catalog.tracks().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["1".to_string(), "1-1".to_string()]);
    }

    #[test]
    fn oversized_episode_durations_saturate() {
        let raw = r#"{
            "podcasts": [{
                "id": "p",
                "title": "Endless",
                "episodes": [
                    { "id": "e", "title": "Forever", "audioUrl": "https://example.com/e.mp3", "duration": 18446744073709551615 }
                ]
            }]
        }"#;
        let catalog: Catalog = serde_json::from_str(raw).unwrap();
        assert_eq!(catalog.track("e").unwrap().duration_hint_ms, Some(u64::MAX));
    }
}
