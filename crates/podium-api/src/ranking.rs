use podium_types::models::{RankedUser, User};

/// Compute the current ranking. Pure: sorts its input and numbers the
/// result 1-based.
///
/// Order: total points descending, then earliest `updated_at` first (the
/// user who has held that score longest outranks a later arrival), then
/// `created_at` and finally `id` so the order is a strict total order even
/// for users touched in the same instant. Ties never share a rank —
/// position determines rank.
pub fn rank(mut users: Vec<User>) -> Vec<RankedUser> {
    users.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| a.updated_at.cmp(&b.updated_at))
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    users
        .into_iter()
        .enumerate()
        .map(|(idx, u)| RankedUser {
            id: u.id,
            name: u.name,
            total_points: u.total_points,
            rank: idx as u32 + 1,
        })
        .collect()
}
