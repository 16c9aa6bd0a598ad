//! Context predicates. All pure; the registry composes them.

use {
    aula_common::{ChannelId, UserId},
    chrono::NaiveTime,
};

use crate::classify::ChannelContext;

pub fn is_private(channel: &ChannelContext) -> bool {
    channel.is_private
}

pub fn is_channel(channel: &ChannelContext, id: &ChannelId) -> bool {
    !id.is_empty() && &channel.channel_id == id
}

pub fn is_admin(sender: &UserId, admins: &[UserId]) -> bool {
    admins.contains(sender)
}

/// Open interval: a request exactly on either bound is outside.
pub fn is_within_window(start: NaiveTime, end: NaiveTime, now: NaiveTime) -> bool {
    start < now && now < end
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[rstest]
    #[case(t(7, 15, 0), false)]
    #[case(t(7, 15, 1), true)]
    #[case(t(7, 30, 0), true)]
    #[case(t(7, 44, 59), true)]
    #[case(t(7, 45, 0), false)]
    #[case(t(6, 0, 0), false)]
    fn window_bounds_are_exclusive(#[case] now: NaiveTime, #[case] inside: bool) {
        assert_eq!(is_within_window(t(7, 15, 0), t(7, 45, 0), now), inside);
    }

    #[test]
    fn channel_predicates() {
        let ctx = ChannelContext {
            is_private: false,
            channel_id: ChannelId::new("att"),
        };
        assert!(is_channel(&ctx, &ChannelId::new("att")));
        assert!(!is_channel(&ctx, &ChannelId::new("other")));
        assert!(!is_channel(&ctx, &ChannelId::new("")));
        assert!(!is_private(&ctx));
    }

    #[test]
    fn admin_membership() {
        let admins = vec![UserId::new("teacher")];
        assert!(is_admin(&UserId::new("teacher"), &admins));
        assert!(!is_admin(&UserId::new("u1"), &admins));
    }
}
