//! Settings document
//!
//! `SettingsDocument` is the full set of client preferences held in memory
//! and in the local cache. `ClientSettings` is the subset exchanged with the
//! server; fields listed in [`SYNC_EXCLUDED_KEYS`] exist only locally.
//!
//! Enumerated settings are closed Rust enums serialized as the strings the
//! server uses, so an unknown choice fails to decode instead of being stored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{SyncError, SyncResult};

/// Keys that stay on this device and are never sent to or taken from the server
pub const SYNC_EXCLUDED_KEYS: &[&str] = &[
    "showed_panel_last_time",
    "selected_twitter_account_id",
    "tv_streaming_quality",
    "tv_data_saver_mode",
    "tv_low_latency_mode",
    "capture_copy_to_clipboard",
    "sync_settings",
    "comment_delay_time",
];

/// Streaming quality of the live TV player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TvStreamingQuality {
    #[serde(rename = "1080p-60fps")]
    P1080At60,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "810p")]
    P810,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "540p")]
    P540,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "240p")]
    P240,
}

/// How the side panel is shown when playback starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanelDisplayState {
    RestorePreviousState,
    AlwaysDisplay,
    AlwaysFold,
}

/// Tab selected in the TV side panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TvPanelTab {
    Program,
    Channel,
    Comment,
    Twitter,
}

/// Where captured frames are saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureSaveMode {
    Browser,
    UploadServer,
    Both,
}

/// Whether captions are composited into captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureCaptionMode {
    VideoOnly,
    CompositingCaption,
    Both,
}

/// Tab selected in the Twitter panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TwitterTab {
    Search,
    Timeline,
    Capture,
}

/// Where hashtags are placed in a tweet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TweetHashtagPosition {
    Prepend,
    Append,
    PrependWithLineBreak,
    AppendWithLineBreak,
}

/// Corner of the watermark drawn on tweeted captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatermarkPosition {
    None,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Match mode of a muted comment keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordMatch {
    Partial,
    Forward,
    Backward,
    Exact,
    Regex,
}

/// A muted comment keyword rule (opaque to sync)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutedCommentKeyword {
    #[serde(rename = "match")]
    pub match_mode: KeywordMatch,
    pub pattern: String,
}

/// The complete client settings document
///
/// Missing keys fall back to their defaults when decoding, so snapshots
/// written by older clients still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDocument {
    pub pinned_channel_ids: Vec<String>,
    pub showed_panel_last_time: bool,
    pub selected_twitter_account_id: Option<i64>,
    pub saved_twitter_hashtags: Vec<String>,
    pub tv_streaming_quality: TvStreamingQuality,
    pub tv_data_saver_mode: bool,
    pub tv_low_latency_mode: bool,
    pub tv_show_superimpose: bool,
    pub panel_display_state: PanelDisplayState,
    pub tv_panel_active_tab: TvPanelTab,
    pub caption_font: String,
    pub always_border_caption_text: bool,
    pub specify_caption_background_color: bool,
    pub caption_background_color: String,
    pub capture_copy_to_clipboard: bool,
    pub capture_save_mode: CaptureSaveMode,
    pub capture_caption_mode: CaptureCaptionMode,
    /// Whether settings are synced with the server at all
    pub sync_settings: bool,
    pub comment_speed_rate: f64,
    pub comment_font_size: f64,
    pub comment_delay_time: f64,
    pub close_comment_form_after_sending: bool,
    pub muted_comment_keywords: Vec<MutedCommentKeyword>,
    pub muted_niconico_user_ids: Vec<String>,
    pub mute_vulgar_comments: bool,
    pub mute_abusive_discriminatory_prejudiced_comments: bool,
    pub mute_big_size_comments: bool,
    pub mute_fixed_comments: bool,
    pub mute_colored_comments: bool,
    pub mute_consecutive_same_characters_comments: bool,
    pub fold_panel_after_sending_tweet: bool,
    pub reset_hashtag_when_program_switches: bool,
    pub auto_add_watching_channel_hashtag: bool,
    pub twitter_active_tab: TwitterTab,
    pub tweet_hashtag_position: TweetHashtagPosition,
    pub tweet_capture_watermark_position: WatermarkPosition,
}

impl Default for SettingsDocument {
    fn default() -> Self {
        Self {
            pinned_channel_ids: Vec::new(),
            showed_panel_last_time: false,
            selected_twitter_account_id: None,
            saved_twitter_hashtags: Vec::new(),
            tv_streaming_quality: TvStreamingQuality::P1080,
            tv_data_saver_mode: false,
            tv_low_latency_mode: true,
            tv_show_superimpose: true,
            panel_display_state: PanelDisplayState::RestorePreviousState,
            tv_panel_active_tab: TvPanelTab::Program,
            caption_font: "Windows TV MaruGothic".to_string(),
            always_border_caption_text: true,
            specify_caption_background_color: false,
            caption_background_color: "rgba(0, 0, 0, 38.2%)".to_string(),
            capture_copy_to_clipboard: false,
            capture_save_mode: CaptureSaveMode::UploadServer,
            capture_caption_mode: CaptureCaptionMode::Both,
            sync_settings: false,
            comment_speed_rate: 1.0,
            comment_font_size: 34.0,
            comment_delay_time: 1.5,
            close_comment_form_after_sending: true,
            muted_comment_keywords: Vec::new(),
            muted_niconico_user_ids: Vec::new(),
            mute_vulgar_comments: true,
            mute_abusive_discriminatory_prejudiced_comments: true,
            mute_big_size_comments: true,
            mute_fixed_comments: false,
            mute_colored_comments: false,
            mute_consecutive_same_characters_comments: false,
            fold_panel_after_sending_tweet: false,
            reset_hashtag_when_program_switches: true,
            auto_add_watching_channel_hashtag: true,
            twitter_active_tab: TwitterTab::Capture,
            tweet_hashtag_position: TweetHashtagPosition::Append,
            tweet_capture_watermark_position: WatermarkPosition::None,
        }
    }
}

/// Settings exchanged with the server (`/api/settings/client`)
///
/// The server always sends the full set, so every field is required on
/// decode. A partial body is rejected rather than filled with defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    pub pinned_channel_ids: Vec<String>,
    pub saved_twitter_hashtags: Vec<String>,
    pub tv_show_superimpose: bool,
    pub panel_display_state: PanelDisplayState,
    pub tv_panel_active_tab: TvPanelTab,
    pub caption_font: String,
    pub always_border_caption_text: bool,
    pub specify_caption_background_color: bool,
    pub caption_background_color: String,
    pub capture_save_mode: CaptureSaveMode,
    pub capture_caption_mode: CaptureCaptionMode,
    pub comment_speed_rate: f64,
    pub comment_font_size: f64,
    pub close_comment_form_after_sending: bool,
    pub muted_comment_keywords: Vec<MutedCommentKeyword>,
    pub muted_niconico_user_ids: Vec<String>,
    pub mute_vulgar_comments: bool,
    pub mute_abusive_discriminatory_prejudiced_comments: bool,
    pub mute_big_size_comments: bool,
    pub mute_fixed_comments: bool,
    pub mute_colored_comments: bool,
    pub mute_consecutive_same_characters_comments: bool,
    pub fold_panel_after_sending_tweet: bool,
    pub reset_hashtag_when_program_switches: bool,
    pub auto_add_watching_channel_hashtag: bool,
    pub twitter_active_tab: TwitterTab,
    pub tweet_hashtag_position: TweetHashtagPosition,
    pub tweet_capture_watermark_position: WatermarkPosition,
}

impl Default for ClientSettings {
    fn default() -> Self {
        SettingsDocument::default().to_client_settings()
    }
}

impl SettingsDocument {
    /// Whether server sync is switched on in this document
    pub fn sync_enabled(&self) -> bool {
        self.sync_settings
    }

    /// Project the sync-eligible fields for upload
    pub fn to_client_settings(&self) -> ClientSettings {
        ClientSettings {
            pinned_channel_ids: self.pinned_channel_ids.clone(),
            saved_twitter_hashtags: self.saved_twitter_hashtags.clone(),
            tv_show_superimpose: self.tv_show_superimpose,
            panel_display_state: self.panel_display_state,
            tv_panel_active_tab: self.tv_panel_active_tab,
            caption_font: self.caption_font.clone(),
            always_border_caption_text: self.always_border_caption_text,
            specify_caption_background_color: self.specify_caption_background_color,
            caption_background_color: self.caption_background_color.clone(),
            capture_save_mode: self.capture_save_mode,
            capture_caption_mode: self.capture_caption_mode,
            comment_speed_rate: self.comment_speed_rate,
            comment_font_size: self.comment_font_size,
            close_comment_form_after_sending: self.close_comment_form_after_sending,
            muted_comment_keywords: self.muted_comment_keywords.clone(),
            muted_niconico_user_ids: self.muted_niconico_user_ids.clone(),
            mute_vulgar_comments: self.mute_vulgar_comments,
            mute_abusive_discriminatory_prejudiced_comments: self
                .mute_abusive_discriminatory_prejudiced_comments,
            mute_big_size_comments: self.mute_big_size_comments,
            mute_fixed_comments: self.mute_fixed_comments,
            mute_colored_comments: self.mute_colored_comments,
            mute_consecutive_same_characters_comments: self
                .mute_consecutive_same_characters_comments,
            fold_panel_after_sending_tweet: self.fold_panel_after_sending_tweet,
            reset_hashtag_when_program_switches: self.reset_hashtag_when_program_switches,
            auto_add_watching_channel_hashtag: self.auto_add_watching_channel_hashtag,
            twitter_active_tab: self.twitter_active_tab,
            tweet_hashtag_position: self.tweet_hashtag_position,
            tweet_capture_watermark_position: self.tweet_capture_watermark_position,
        }
    }

    /// Overwrite the sync-eligible fields with settings received from the server
    ///
    /// Local-only fields (including `sync_settings`) are left untouched.
    pub fn merge_client_settings(&mut self, remote: ClientSettings) {
        self.pinned_channel_ids = remote.pinned_channel_ids;
        self.saved_twitter_hashtags = remote.saved_twitter_hashtags;
        self.tv_show_superimpose = remote.tv_show_superimpose;
        self.panel_display_state = remote.panel_display_state;
        self.tv_panel_active_tab = remote.tv_panel_active_tab;
        self.caption_font = remote.caption_font;
        self.always_border_caption_text = remote.always_border_caption_text;
        self.specify_caption_background_color = remote.specify_caption_background_color;
        self.caption_background_color = remote.caption_background_color;
        self.capture_save_mode = remote.capture_save_mode;
        self.capture_caption_mode = remote.capture_caption_mode;
        self.comment_speed_rate = remote.comment_speed_rate;
        self.comment_font_size = remote.comment_font_size;
        self.close_comment_form_after_sending = remote.close_comment_form_after_sending;
        self.muted_comment_keywords = remote.muted_comment_keywords;
        self.muted_niconico_user_ids = remote.muted_niconico_user_ids;
        self.mute_vulgar_comments = remote.mute_vulgar_comments;
        self.mute_abusive_discriminatory_prejudiced_comments =
            remote.mute_abusive_discriminatory_prejudiced_comments;
        self.mute_big_size_comments = remote.mute_big_size_comments;
        self.mute_fixed_comments = remote.mute_fixed_comments;
        self.mute_colored_comments = remote.mute_colored_comments;
        self.mute_consecutive_same_characters_comments =
            remote.mute_consecutive_same_characters_comments;
        self.fold_panel_after_sending_tweet = remote.fold_panel_after_sending_tweet;
        self.reset_hashtag_when_program_switches = remote.reset_hashtag_when_program_switches;
        self.auto_add_watching_channel_hashtag = remote.auto_add_watching_channel_hashtag;
        self.twitter_active_tab = remote.twitter_active_tab;
        self.tweet_hashtag_position = remote.tweet_hashtag_position;
        self.tweet_capture_watermark_position = remote.tweet_capture_watermark_position;
    }

    /// Apply a partial (or full) set of key/value pairs
    ///
    /// Each value is checked against the field's type and allowed choices.
    /// Either every pair is applied or none is.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> SyncResult<()> {
        let mut fields = self.to_fields()?;

        let mut patched = self.clone();
        for (key, value) in patch {
            if !fields.contains_key(key) {
                return Err(SyncError::UnknownSetting(key.clone()));
            }
            fields.insert(key.clone(), value.clone());
            patched = serde_json::from_value(Value::Object(fields.clone())).map_err(|e| {
                SyncError::InvalidSetting {
                    key: key.clone(),
                    details: e.to_string(),
                }
            })?;
        }

        *self = patched;
        Ok(())
    }

    /// Look up a single setting as JSON
    pub fn get(&self, key: &str) -> Option<Value> {
        self.to_fields().ok()?.remove(key)
    }

    /// Names of every setting in the document
    pub fn keys() -> Vec<String> {
        SettingsDocument::default()
            .to_fields()
            .map(|fields| fields.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn to_fields(&self) -> SyncResult<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            _ => Ok(Map::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_excluded_keys_partition_document() {
        let doc_keys: BTreeSet<String> = SettingsDocument::keys().into_iter().collect();
        let synced_keys: BTreeSet<String> =
            object(serde_json::to_value(ClientSettings::default()).unwrap())
                .keys()
                .cloned()
                .collect();
        let excluded: BTreeSet<String> =
            SYNC_EXCLUDED_KEYS.iter().map(|k| k.to_string()).collect();

        assert!(synced_keys.is_disjoint(&excluded));
        let union: BTreeSet<String> = synced_keys.union(&excluded).cloned().collect();
        assert_eq!(union, doc_keys);
    }

    #[test]
    fn test_enum_wire_names() {
        let doc = SettingsDocument::default();
        assert_eq!(doc.get("tv_streaming_quality"), Some(json!("1080p")));
        assert_eq!(doc.get("panel_display_state"), Some(json!("RestorePreviousState")));
        assert_eq!(doc.get("tweet_capture_watermark_position"), Some(json!("None")));

        let keyword = MutedCommentKeyword {
            match_mode: KeywordMatch::Regex,
            pattern: "^wwww".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&keyword).unwrap(),
            json!({"match": "regex", "pattern": "^wwww"})
        );
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let doc: SettingsDocument =
            serde_json::from_value(json!({"caption_font": "Rounded M+ 1m", "extra": 1})).unwrap();

        assert_eq!(doc.caption_font, "Rounded M+ 1m");
        assert_eq!(doc.comment_font_size, 34.0);
        assert!(!doc.sync_settings);
    }

    #[test]
    fn test_partial_server_payload_rejected() {
        assert!(serde_json::from_value::<ClientSettings>(json!({})).is_err());

        let mut wire = object(serde_json::to_value(ClientSettings::default()).unwrap());
        wire.remove("comment_font_size");
        assert!(serde_json::from_value::<ClientSettings>(Value::Object(wire)).is_err());
    }

    #[test]
    fn test_merge_keeps_local_only_fields() {
        let mut doc = SettingsDocument {
            sync_settings: true,
            tv_streaming_quality: TvStreamingQuality::P480,
            ..Default::default()
        };

        let mut remote = ClientSettings::default();
        remote.pinned_channel_ids = vec!["gr011".to_string()];
        remote.twitter_active_tab = TwitterTab::Timeline;
        doc.merge_client_settings(remote.clone());

        assert_eq!(doc.to_client_settings(), remote);
        assert!(doc.sync_settings);
        assert_eq!(doc.tv_streaming_quality, TvStreamingQuality::P480);
    }

    #[test]
    fn test_apply_patch() {
        let mut doc = SettingsDocument::default();
        doc.apply_patch(&object(json!({
            "capture_save_mode": "Both",
            "muted_niconico_user_ids": ["abc"],
            "comment_speed_rate": 1.5
        })))
        .unwrap();

        assert_eq!(doc.capture_save_mode, CaptureSaveMode::Both);
        assert_eq!(doc.muted_niconico_user_ids, vec!["abc".to_string()]);
        assert_eq!(doc.comment_speed_rate, 1.5);
    }

    #[test]
    fn test_apply_patch_rejects_illegal_choice() {
        let mut doc = SettingsDocument::default();
        let err = doc
            .apply_patch(&object(json!({
                "mute_fixed_comments": true,
                "capture_save_mode": "Cloud"
            })))
            .unwrap_err();

        assert!(matches!(err, SyncError::InvalidSetting { ref key, .. } if key == "capture_save_mode"));
        // Nothing applied
        assert_eq!(doc, SettingsDocument::default());
    }

    #[test]
    fn test_apply_patch_rejects_unknown_key() {
        let mut doc = SettingsDocument::default();
        let err = doc
            .apply_patch(&object(json!({"volume": 10})))
            .unwrap_err();

        assert!(matches!(err, SyncError::UnknownSetting(ref key) if key == "volume"));
    }

    #[test]
    fn test_apply_patch_null_clears_optional() {
        let mut doc = SettingsDocument {
            selected_twitter_account_id: Some(7),
            ..Default::default()
        };
        doc.apply_patch(&object(json!({"selected_twitter_account_id": null})))
            .unwrap();
        assert_eq!(doc.selected_twitter_account_id, None);

        let err = doc
            .apply_patch(&object(json!({"pinned_channel_ids": null})))
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidSetting { .. }));
    }
}
