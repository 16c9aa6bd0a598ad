/// Config schema types (bot, discord, teacher, channels, class, quiz, grading).
use std::collections::BTreeMap;

use {
    aula_common::{ChannelId, UserId},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AulaConfig {
    pub bot: BotConfig,
    pub discord: DiscordConfig,
    pub teacher: TeacherConfig,
    pub channels: ChannelsConfig,
    pub class: ClassConfig,
    pub partials: Vec<PartialConfig>,
    pub quiz: QuizConfig,
    pub emojis: EmojiConfig,
    pub grades: GradesConfig,
    pub presence: PresenceConfig,
    pub registration: RegistrationConfig,
    pub schedule: ScheduleConfig,
    pub storage: StorageConfig,
    pub reports: ReportsConfig,
}

impl AulaConfig {
    /// The teacher plus any extra admins.
    pub fn admin_ids(&self) -> Vec<UserId> {
        let mut ids = Vec::with_capacity(self.teacher.admins.len() + 1);
        if !self.teacher.id.is_empty() {
            ids.push(self.teacher.id.clone());
        }
        for admin in &self.teacher.admins {
            if !ids.contains(admin) {
                ids.push(admin.clone());
            }
        }
        ids
    }
}

/// General bot behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Character that starts every command, e.g. `-attendance A1B2`.
    pub prefix: char,
    /// When set, non-admins only get the "unavailable" error.
    pub maintenance: bool,
    /// IANA timezone used for class windows and the daily schedule.
    pub timezone: String,
}

impl BotConfig {
    /// Parsed timezone, `None` when the name is not a known IANA zone.
    pub fn tz(&self) -> Option<chrono_tz::Tz> {
        self.timezone.parse().ok()
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: '-',
            maintenance: false,
            timezone: "UTC".into(),
        }
    }
}

/// Discord credentials.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,
    /// Guild whose member presences are tracked.
    pub guild_id: Option<String>,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"[REDACTED]")
            .field("guild_id", &self.guild_id)
            .finish()
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            guild_id: None,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Who runs the class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeacherConfig {
    /// The teacher's user id. Also the only identity whose approval
    /// gestures are honoured.
    pub id: UserId,
    /// Additional users allowed to run admin commands.
    pub admins: Vec<UserId>,
}

/// Designated channels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub attendance: ChannelId,
    pub participations: ChannelId,
    pub activities: ChannelId,
    pub activities_presented: ChannelId,
    pub announcements: ChannelId,
    pub main_voice: ChannelId,
}

/// Daily class timetable, all times `HH:MM` in the bot timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassConfig {
    pub name: String,
    pub code: String,
    pub start_time: String,
    pub end_time: String,
    pub attendance_end_time: String,
    pub activity_deadline: String,
}

impl Default for ClassConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            code: "class".into(),
            start_time: "07:15".into(),
            end_time: "09:15".into(),
            attendance_end_time: "07:45".into(),
            activity_deadline: "23:59".into(),
        }
    }
}

/// Parse an `HH:MM` wall-clock time.
pub fn parse_clock_time(value: &str) -> Option<chrono::NaiveTime> {
    chrono::NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// A grading period. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PartialConfig {
    pub name: String,
    pub start_date: String,
    pub end_date: String,
}

/// Live quiz timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    pub question_time_secs: u64,
    /// How often the remaining-time text is refreshed.
    pub tick_interval_ms: u64,
    /// Delay between the "3... 2... 1..." messages.
    pub countdown_step_ms: u64,
    /// Any of these on the announcement starts the quiz.
    pub ack_emojis: Vec<String>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            question_time_secs: 30,
            tick_interval_ms: 1000,
            countdown_step_ms: 1000,
            ack_emojis: vec!["✅".into(), "⏰".into(), "🦖".into()],
        }
    }
}

/// Reaction symbols used for feedback and approvals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmojiConfig {
    pub success: String,
    pub error: String,
    pub thumbs_up: String,
    pub participation_request: String,
    /// Teacher gesture that approves a participation request.
    pub approve: String,
}

impl Default for EmojiConfig {
    fn default() -> Self {
        Self {
            success: "✅".into(),
            error: "❌".into(),
            thumbs_up: "👍".into(),
            participation_request: "💬".into(),
            approve: "✅".into(),
        }
    }
}

/// Activity grading gestures: emoji → grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradesConfig {
    pub gestures: BTreeMap<String, String>,
}

impl Default for GradesConfig {
    fn default() -> Self {
        let keycaps = [
            ("1️⃣", "1"),
            ("2️⃣", "2"),
            ("3️⃣", "3"),
            ("4️⃣", "4"),
            ("5️⃣", "5"),
            ("6️⃣", "6"),
            ("7️⃣", "7"),
            ("8️⃣", "8"),
            ("9️⃣", "9"),
            ("🔟", "10"),
        ];
        Self {
            gestures: keycaps
                .into_iter()
                .map(|(emoji, grade)| (emoji.to_string(), grade.to_string()))
                .collect(),
        }
    }
}

/// Presence requirements for in-class requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Attendance and participation need an online desktop client.
    pub require_desktop: bool,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            require_desktop: true,
        }
    }
}

/// Follow-up sent privately after a successful registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub form_title: Option<String>,
    pub form_url: Option<String>,
}

/// Fixed daily broadcasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    /// Minutes before `attendance_end_time` at which a warning is posted.
    pub attendance_warning_minutes: Vec<u32>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            attendance_warning_minutes: vec![5],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON store file. Defaults to `<data_dir>/aula.json`.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Export directory. Defaults to `<data_dir>/reports`.
    pub dir: Option<String>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classroom_conventions() {
        let cfg = AulaConfig::default();
        assert_eq!(cfg.bot.prefix, '-');
        assert!(!cfg.bot.maintenance);
        assert_eq!(cfg.quiz.question_time_secs, 30);
        assert_eq!(cfg.quiz.ack_emojis.len(), 3);
        assert_eq!(cfg.grades.gestures.get("🔟").map(String::as_str), Some("10"));
        assert!(cfg.presence.require_desktop);
    }

    #[test]
    fn admin_ids_include_teacher_once() {
        let mut cfg = AulaConfig::default();
        cfg.teacher.id = UserId::new("t1");
        cfg.teacher.admins = vec![UserId::new("t1"), UserId::new("a2")];
        assert_eq!(cfg.admin_ids(), vec![UserId::new("t1"), UserId::new("a2")]);
    }

    #[test]
    fn deserialize_partial_toml() {
        let raw = r#"
            [bot]
            prefix = "!"
            timezone = "America/La_Paz"

            [teacher]
            id = "818983033838370867"

            [channels]
            attendance = "818988068799250453"

            [[partials]]
            name = "Primer Parcial"
            start_date = "2021-09-01"
            end_date = "2021-10-15"
        "#;
        let cfg: AulaConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.bot.prefix, '!');
        assert_eq!(cfg.teacher.id.as_str(), "818983033838370867");
        assert_eq!(cfg.channels.attendance.as_str(), "818988068799250453");
        assert_eq!(cfg.partials.len(), 1);
        // untouched sections keep their defaults
        assert_eq!(cfg.class.activity_deadline, "23:59");
    }

    #[test]
    fn clock_times_and_timezone_parse() {
        assert_eq!(
            parse_clock_time("07:45"),
            chrono::NaiveTime::from_hms_opt(7, 45, 0)
        );
        assert!(parse_clock_time("7h45").is_none());
        let bot = BotConfig {
            timezone: "America/La_Paz".into(),
            ..BotConfig::default()
        };
        assert_eq!(bot.tz(), Some(chrono_tz::America::La_Paz));
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = DiscordConfig {
            token: Secret::new("super-secret".into()),
            guild_id: None,
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
