use std::collections::HashSet;

use feedwatch_core::ScrapedPost;

/// Admits only posts not yet processed for a task.
///
/// Ids are checked against both the persisted markers and every id admitted
/// earlier in the same execution, so a post surfacing under two subjects is
/// delivered once.
#[derive(Debug)]
pub struct NewPostFilter<'a> {
    persisted: &'a HashSet<String>,
    admitted: HashSet<String>,
}

impl<'a> NewPostFilter<'a> {
    #[must_use]
    pub fn new(persisted: &'a HashSet<String>) -> Self {
        Self {
            persisted,
            admitted: HashSet::new(),
        }
    }

    /// Returns the posts from `posts` that are new, in their original order.
    pub fn admit(&mut self, posts: Vec<ScrapedPost>) -> Vec<ScrapedPost> {
        posts
            .into_iter()
            .filter(|post| {
                !self.persisted.contains(&post.unique_id)
                    && self.admitted.insert(post.unique_id.clone())
            })
            .collect()
    }

    /// Number of posts admitted so far.
    #[must_use]
    pub fn admitted_count(&self) -> usize {
        self.admitted.len()
    }
}

/// Counts ids that occur more than once in a single pass result.
#[must_use]
pub fn duplicate_count(posts: &[ScrapedPost]) -> usize {
    let unique: HashSet<&str> = posts.iter().map(|p| p.unique_id.as_str()).collect();
    posts.len() - unique.len()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn post(id: &str) -> ScrapedPost {
        ScrapedPost {
            unique_id: id.to_string(),
            content: format!("user: post {id}"),
            posted_at: Utc::now(),
            time_label: "1m".to_string(),
            url: String::new(),
        }
    }

    fn ids(posts: &[ScrapedPost]) -> Vec<&str> {
        posts.iter().map(|p| p.unique_id.as_str()).collect()
    }

    #[test]
    fn persisted_ids_are_rejected() {
        let persisted: HashSet<String> = ["a".to_string()].into_iter().collect();
        let mut filter = NewPostFilter::new(&persisted);

        let admitted = filter.admit(vec![post("a"), post("b")]);

        assert_eq!(ids(&admitted), vec!["b"]);
    }

    #[test]
    fn ids_admitted_for_one_subject_are_rejected_for_the_next() {
        let persisted = HashSet::new();
        let mut filter = NewPostFilter::new(&persisted);

        let first = filter.admit(vec![post("a"), post("b")]);
        let second = filter.admit(vec![post("b"), post("c")]);

        assert_eq!(ids(&first), vec!["a", "b"]);
        assert_eq!(ids(&second), vec!["c"]);
        assert_eq!(filter.admitted_count(), 3);
    }

    #[test]
    fn duplicates_within_one_batch_are_admitted_once() {
        let persisted = HashSet::new();
        let mut filter = NewPostFilter::new(&persisted);

        let admitted = filter.admit(vec![post("a"), post("a")]);

        assert_eq!(ids(&admitted), vec!["a"]);
    }

    #[test]
    fn duplicate_count_reports_repeats() {
        assert_eq!(duplicate_count(&[post("a"), post("b"), post("a")]), 1);
        assert_eq!(duplicate_count(&[]), 0);
    }
}
