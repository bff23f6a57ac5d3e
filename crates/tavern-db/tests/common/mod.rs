//! Contract checks shared by every backend test file.

use chrono::DateTime;
use tavern_db::Backend;
use tavern_types::{ChannelId, GuildId, GuildRecord, MemberKey, MemberRecord, UserId, UserRecord};

pub async fn guild_round_trip(backend: &Backend) {
    let guild = GuildId(42);
    assert!(backend.get_guild(guild).await.unwrap().is_empty());

    let record = GuildRecord {
        prefix: Some("!".to_owned()),
        language: Some("fr".to_owned()),
        mod_log_channel: Some(ChannelId(900)),
        roles: Some(vec!["artist".to_owned(), "gamer".to_owned()]),
    };
    backend.set_guild(guild, &record).await.unwrap();
    assert_eq!(backend.get_guild(guild).await.unwrap(), record);

    // Partial upsert keeps the other columns.
    let patch = GuildRecord {
        prefix: Some("$".to_owned()),
        ..GuildRecord::default()
    };
    backend.set_guild(guild, &patch).await.unwrap();
    let stored = backend.get_guild(guild).await.unwrap();
    assert_eq!(stored.prefix.as_deref(), Some("$"));
    assert_eq!(stored.language.as_deref(), Some("fr"));
    assert_eq!(stored.mod_log_channel, Some(ChannelId(900)));
    assert_eq!(stored.roles, record.roles);

    // Other guilds are unaffected.
    assert!(backend.get_guild(GuildId(43)).await.unwrap().is_empty());
}

pub async fn member_round_trip(backend: &Backend) {
    let key = MemberKey::new(UserId(7), GuildId(42));
    assert_eq!(backend.get_member(key).await.unwrap().warn_count, None);

    backend
        .set_member(key, &MemberRecord { warn_count: Some(3) })
        .await
        .unwrap();
    assert_eq!(backend.get_member(key).await.unwrap().warn_count, Some(3));

    // Same member, different guild: separate row.
    let other = MemberKey::new(UserId(7), GuildId(43));
    assert_eq!(backend.get_member(other).await.unwrap().warn_count, None);
}

pub async fn user_round_trip(backend: &Backend) {
    let user = UserId(1);
    let claimed = DateTime::from_timestamp(1_700_000_000, 0);
    backend
        .set_user(
            user,
            &UserRecord {
                balance: Some(500),
                last_daily_claim: claimed,
            },
        )
        .await
        .unwrap();

    let stored = backend.get_user(user).await.unwrap();
    assert_eq!(stored.balance, Some(500));
    assert_eq!(stored.last_daily_claim, claimed);
}

pub async fn user_pair_writes_both(backend: &Backend) {
    let a = UserRecord {
        balance: Some(300),
        last_daily_claim: None,
    };
    let b = UserRecord {
        balance: Some(200),
        last_daily_claim: None,
    };
    backend
        .set_user_pair((UserId(10), &a), (UserId(11), &b))
        .await
        .unwrap();
    assert_eq!(backend.get_user(UserId(10)).await.unwrap().balance, Some(300));
    assert_eq!(backend.get_user(UserId(11)).await.unwrap().balance, Some(200));
}

pub async fn tags_are_idempotent(backend: &Backend) {
    backend
        .append_tags("danbooru", &["catgirl".to_owned(), "landscape".to_owned()])
        .await
        .unwrap();
    backend
        .append_tags("danbooru", &["catgirl".to_owned()])
        .await
        .unwrap();
    backend
        .append_tags("gelbooru", &["catgirl".to_owned()])
        .await
        .unwrap();
    backend.append_tags("gelbooru", &[]).await.unwrap();

    let all = backend.get_all_tags().await.unwrap();
    assert_eq!(
        all.get("danbooru"),
        Some(&vec!["catgirl".to_owned(), "landscape".to_owned()])
    );
    assert_eq!(all.get("gelbooru"), Some(&vec!["catgirl".to_owned()]));
}
