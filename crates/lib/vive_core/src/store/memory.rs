//! Process-local store backed by concurrent maps.
//!
//! Used when no database is configured and by the test suites. Deletes cascade
//! the same way the PostgreSQL schema does: user → posts, comments, saves;
//! post → comments, saves; comment → replies.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{
    CategoryStore, CommentStore, PostStore, SavedPostStore, StoreError, StoreResult, UserStore,
};
use crate::models::auth::{NewUser, User};
use crate::models::social::{Category, Comment, NewCategory, NewComment, NewPost, Post};

/// In-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: AtomicI64,
    users: DashMap<i64, User>,
    /// email → user id; the uniqueness index.
    emails: DashMap<String, i64>,
    categories: DashMap<i64, Category>,
    posts: DashMap<i64, Post>,
    comments: DashMap<i64, Comment>,
    /// (user id, post id) → save sequence number.
    saved: DashMap<(i64, i64), i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn sorted<T: Clone>(map: &DashMap<i64, T>, keep: impl Fn(&T) -> bool) -> Vec<T> {
        let mut rows: Vec<(i64, T)> = map
            .iter()
            .filter(|e| keep(e.value()))
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        rows.sort_by_key(|(id, _)| *id);
        rows.into_iter().map(|(_, v)| v).collect()
    }

    /// Remove each root comment and every reply beneath it. Returns whether
    /// any root existed.
    fn remove_comment_trees(&self, roots: Vec<i64>) -> bool {
        let mut replies: HashMap<i64, Vec<i64>> = HashMap::new();
        for c in self.comments.iter() {
            if let Some(parent) = c.parent_id {
                replies.entry(parent).or_default().push(c.id);
            }
        }
        let mut removed = false;
        for root in &roots {
            removed |= self.comments.remove(root).is_some();
        }
        let mut stack = roots;
        while let Some(id) = stack.pop() {
            for reply in replies.remove(&id).unwrap_or_default() {
                self.comments.remove(&reply);
                stack.push(reply);
            }
        }
        removed
    }

    fn remove_post_cascade(&self, id: i64) -> bool {
        let removed = self.posts.remove(&id).is_some();
        self.comments.retain(|_, c| c.post_id != id);
        self.saved.retain(|(_, post_id), _| *post_id != id);
        removed
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let Some(id) = self.emails.get(email).map(|e| *e.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let id = match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                return Err(StoreError::Conflict(format!(
                    "User with email '{}' already exists.",
                    user.email
                )));
            }
            Entry::Vacant(slot) => {
                let id = self.next_id();
                slot.insert(id);
                id
            }
        };
        let stored = User {
            id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            about: user.about,
            roles: user.roles,
        };
        self.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, user: &User) -> StoreResult<User> {
        let previous_email = self
            .users
            .get(&user.id)
            .map(|u| u.email.clone())
            .ok_or_else(|| StoreError::not_found("User", user.id))?;

        if previous_email != user.email {
            match self.emails.entry(user.email.clone()) {
                Entry::Occupied(_) => {
                    return Err(StoreError::Conflict(format!(
                        "User with email '{}' already exists.",
                        user.email
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(user.id);
                }
            }
            self.emails.remove(&previous_email);
        }

        self.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let Some((_, user)) = self.users.remove(&id) else {
            return Ok(false);
        };
        self.emails.remove(&user.email);

        let owned_posts: Vec<i64> = self
            .posts
            .iter()
            .filter(|p| p.user_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in owned_posts {
            self.remove_post_cascade(post_id);
        }
        let owned_comments: Vec<i64> = self
            .comments
            .iter()
            .filter(|c| c.user_id == id)
            .map(|c| c.id)
            .collect();
        self.remove_comment_trees(owned_comments);
        self.saved.retain(|(user_id, _), _| *user_id != id);
        Ok(true)
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        Ok(Self::sorted(&self.users, |_| true))
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn find(&self, id: i64) -> StoreResult<Option<Category>> {
        Ok(self.categories.get(&id).map(|c| c.clone()))
    }

    async fn create(&self, category: NewCategory) -> StoreResult<Category> {
        let id = self.next_id();
        let stored = Category {
            id,
            title: category.title,
            description: category.description,
        };
        self.categories.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: i64, category: NewCategory) -> StoreResult<Category> {
        let mut entry = self
            .categories
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Category", id))?;
        entry.title = category.title;
        entry.description = category.description;
        Ok(entry.clone())
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        if self.categories.remove(&id).is_none() {
            return Ok(false);
        }
        let posts: Vec<i64> = self
            .posts
            .iter()
            .filter(|p| p.category_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in posts {
            self.remove_post_cascade(post_id);
        }
        Ok(true)
    }

    async fn list(&self) -> StoreResult<Vec<Category>> {
        Ok(Self::sorted(&self.categories, |_| true))
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn find(&self, id: i64) -> StoreResult<Option<Post>> {
        Ok(self.posts.get(&id).map(|p| p.clone()))
    }

    async fn create(&self, post: NewPost) -> StoreResult<Post> {
        let id = self.next_id();
        let stored = Post {
            id,
            title: post.title,
            content: post.content,
            category_id: post.category_id,
            user_id: post.user_id,
            created_at: Utc::now(),
        };
        self.posts.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: i64, title: &str, content: &str) -> StoreResult<Post> {
        let mut entry = self
            .posts
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Post", id))?;
        entry.title = title.to_string();
        entry.content = content.to_string();
        Ok(entry.clone())
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        Ok(self.remove_post_cascade(id))
    }

    async fn list(&self) -> StoreResult<Vec<Post>> {
        Ok(Self::sorted(&self.posts, |_| true))
    }

    async fn list_by_category(&self, category_id: i64) -> StoreResult<Vec<Post>> {
        Ok(Self::sorted(&self.posts, |p| p.category_id == category_id))
    }

    async fn list_by_user(&self, user_id: i64) -> StoreResult<Vec<Post>> {
        Ok(Self::sorted(&self.posts, |p| p.user_id == user_id))
    }

    async fn search(&self, keyword: &str) -> StoreResult<Vec<Post>> {
        let needle = keyword.to_lowercase();
        Ok(Self::sorted(&self.posts, |p| {
            p.title.to_lowercase().contains(&needle)
        }))
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn find(&self, id: i64) -> StoreResult<Option<Comment>> {
        Ok(self.comments.get(&id).map(|c| c.clone()))
    }

    async fn create(&self, comment: NewComment) -> StoreResult<Comment> {
        let id = self.next_id();
        let stored = Comment {
            id,
            content: comment.content,
            post_id: comment.post_id,
            user_id: comment.user_id,
            parent_id: comment.parent_id,
            created_at: Utc::now(),
            edited_at: None,
        };
        self.comments.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_content(&self, id: i64, content: &str) -> StoreResult<Comment> {
        let mut entry = self
            .comments
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Comment", id))?;
        entry.content = content.to_string();
        entry.edited_at = Some(Utc::now());
        Ok(entry.clone())
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        Ok(self.remove_comment_trees(vec![id]))
    }

    async fn list_by_post(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        Ok(Self::sorted(&self.comments, |c| c.post_id == post_id))
    }
}

#[async_trait]
impl SavedPostStore for MemoryStore {
    async fn save(&self, user_id: i64, post_id: i64) -> StoreResult<()> {
        match self.saved.entry((user_id, post_id)) {
            Entry::Occupied(_) => Err(StoreError::Conflict("Post already saved".into())),
            Entry::Vacant(slot) => {
                slot.insert(self.next_id());
                Ok(())
            }
        }
    }

    async fn unsave(&self, user_id: i64, post_id: i64) -> StoreResult<bool> {
        Ok(self.saved.remove(&(user_id, post_id)).is_some())
    }

    async fn is_saved(&self, user_id: i64, post_id: i64) -> StoreResult<bool> {
        Ok(self.saved.contains_key(&(user_id, post_id)))
    }

    async fn saved_by_user(&self, user_id: i64) -> StoreResult<Vec<Post>> {
        let mut saves: Vec<(i64, i64)> = self
            .saved
            .iter()
            .filter(|e| e.key().0 == user_id)
            .map(|e| (*e.value(), e.key().1))
            .collect();
        saves.sort_unstable();
        Ok(saves
            .into_iter()
            .filter_map(|(_, post_id)| self.posts.get(&post_id).map(|p| p.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::models::auth::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Test".into(),
            email: email.into(),
            password_hash: "hash".into(),
            about: None,
            roles: BTreeSet::from([Role::User]),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        UserStore::create(&store, new_user("a@example.com")).await.unwrap();
        let err = UserStore::create(&store, new_user("a@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn find_by_email_after_email_change() {
        let store = MemoryStore::new();
        let mut user = UserStore::create(&store, new_user("old@example.com"))
            .await
            .unwrap();
        user.email = "new@example.com".into();
        UserStore::update(&store, &user).await.unwrap();

        assert!(store.find_by_email("old@example.com").await.unwrap().is_none());
        let found = store.find_by_email("new@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn deleting_comment_removes_replies() {
        let store = MemoryStore::new();
        let root = CommentStore::create(
            &store,
            NewComment {
                content: "root".into(),
                post_id: 1,
                user_id: 1,
                parent_id: None,
            },
        )
        .await
        .unwrap();
        let reply = CommentStore::create(
            &store,
            NewComment {
                content: "reply".into(),
                post_id: 1,
                user_id: 2,
                parent_id: Some(root.id),
            },
        )
        .await
        .unwrap();

        assert!(CommentStore::delete(&store, root.id).await.unwrap());
        assert!(CommentStore::find(&store, reply.id).await.unwrap().is_none());
        assert!(!CommentStore::delete(&store, root.id).await.unwrap());
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let store = MemoryStore::new();
        PostStore::create(
            &store,
            NewPost {
                title: "Feria de las Flores".into(),
                content: "desfile".into(),
                category_id: 1,
                user_id: 1,
            },
        )
        .await
        .unwrap();
        assert_eq!(store.search("flores").await.unwrap().len(), 1);
        assert!(store.search("salsa").await.unwrap().is_empty());
    }

    fn new_comment(user_id: i64, parent_id: Option<i64>) -> NewComment {
        NewComment {
            content: "c".into(),
            post_id: 1,
            user_id,
            parent_id,
        }
    }

    #[tokio::test]
    async fn deep_reply_chain_deletes_without_recursion() {
        let store = MemoryStore::new();
        let root = CommentStore::create(&store, new_comment(1, None)).await.unwrap();
        let mut parent = root.id;
        for _ in 0..50_000 {
            parent = CommentStore::create(&store, new_comment(2, Some(parent)))
                .await
                .unwrap()
                .id;
        }
        let sibling = CommentStore::create(&store, new_comment(3, None)).await.unwrap();

        let store = std::sync::Arc::new(store);
        let worker = store.clone();
        std::thread::Builder::new()
            .stack_size(128 * 1024)
            .spawn(move || worker.remove_comment_trees(vec![root.id]))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(store.comments.len(), 1);
        assert!(CommentStore::find(store.as_ref(), sibling.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn saves_are_unique_ordered_and_cascade() {
        let store = MemoryStore::new();
        let post = |title: &str| NewPost {
            title: title.into(),
            content: "x".into(),
            category_id: 1,
            user_id: 1,
        };
        let first = PostStore::create(&store, post("first")).await.unwrap();
        let second = PostStore::create(&store, post("second")).await.unwrap();

        store.save(7, second.id).await.unwrap();
        store.save(7, first.id).await.unwrap();
        assert!(matches!(
            store.save(7, first.id).await,
            Err(StoreError::Conflict(_))
        ));
        let titles: Vec<String> = store
            .saved_by_user(7)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, ["second", "first"]);

        PostStore::delete(&store, second.id).await.unwrap();
        assert!(!store.is_saved(7, second.id).await.unwrap());
        assert!(store.unsave(7, first.id).await.unwrap());
        assert!(!store.unsave(7, first.id).await.unwrap());
    }
}
