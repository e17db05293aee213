//! Read models for the public pages.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::AppError;
use crate::models::{Course, CourseCard, Lecture};
use crate::repository::{CourseRepository, LectureRepository, Repositories};

const FEATURED_COUNT: usize = 3;
const PLAY_STORE_URL: &str = "https://play.google.com/store/apps/details?id=com.quranly.app";

#[derive(Debug, Clone, Serialize)]
pub struct AppPromotion {
    pub badge: &'static str,
    pub heading: &'static str,
    pub description: &'static str,
    pub app_name: &'static str,
    pub tagline: &'static str,
    pub store_url: &'static str,
}

impl Default for AppPromotion {
    fn default() -> Self {
        Self {
            badge: "প্রস্তাবিত অ্যাপ",
            heading: "প্রস্তাবিত কুরআন অ্যাপ",
            description: "কুরআন তিলাওয়াত, অনুবাদ ও তাফসীর সহ একটি সম্পূর্ণ কুরআন অ্যাপ। এখনই ডাউনলোড করুন এবং প্রতিদিন কুরআন পড়ুন।",
            app_name: "Quranly App",
            tagline: "কুরআন পড়ুন, শুনুন এবং বুঝুন। বাংলা অনুবাদ ও তাফসীর সহ।",
            store_url: PLAY_STORE_URL,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeView {
    pub featured: Vec<CourseCard>,
    pub app: AppPromotion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LectureItem {
    pub id: String,
    pub title: String,
    pub sort_order: i32,
    pub locked: bool,
    pub selected: bool,
}

/// The lecture being watched, with links to its public neighbours.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedLecture {
    pub id: String,
    pub title: String,
    pub embed_url: Option<String>,
    pub pdf_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub previous: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseDetailView {
    pub course: CourseCard,
    pub lectures: Vec<LectureItem>,
    pub selected: Option<SelectedLecture>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotFoundView {
    pub message: &'static str,
    pub back_href: &'static str,
    pub back_label: &'static str,
}

impl Default for NotFoundView {
    fn default() -> Self {
        Self {
            message: "কোর্সটি পাওয়া যায়নি",
            back_href: "/courses",
            back_label: "সকল কোর্স দেখুন",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CoursePage {
    Found(CourseDetailView),
    NotFound(NotFoundView),
}

pub struct Catalog {
    courses: Arc<dyn CourseRepository>,
    lectures: Arc<dyn LectureRepository>,
}

impl Catalog {
    pub fn new(repos: &Repositories) -> Self {
        Self { courses: repos.courses.clone(), lectures: repos.lectures.clone() }
    }

    async fn published(&self) -> Result<Vec<CourseCard>, AppError> {
        let courses: Vec<Course> = self.courses.list().await?.into_iter().filter(|c| c.is_published).collect();
        if courses.is_empty() {
            return Ok(Vec::new());
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        for lecture in self.lectures.list(None).await? {
            *counts.entry(lecture.course_id).or_default() += 1;
        }

        Ok(courses
            .iter()
            .map(|c| CourseCard::new(c, counts.get(&c.id).copied().unwrap_or(0)))
            .collect())
    }

    pub async fn home(&self) -> Result<HomeView, AppError> {
        let mut featured = self.published().await?;
        featured.truncate(FEATURED_COUNT);
        Ok(HomeView { featured, app: AppPromotion::default() })
    }

    pub async fn courses(&self) -> Result<Vec<CourseCard>, AppError> {
        self.published().await
    }

    /// Course page for `slug`. Unknown and unpublished slugs yield the
    /// not-found view. `selected` only resolves to a public lecture.
    pub async fn course_detail(&self, slug: &str, selected: Option<&str>) -> Result<CoursePage, AppError> {
        let Some(course) = self.courses.find_published_by_slug(slug).await? else {
            debug!("course {:?} not found", slug);
            return Ok(CoursePage::NotFound(NotFoundView::default()));
        };

        let lectures = self.lectures.list(Some(&course.id)).await?;
        let selected = selected.and_then(|id| select(&lectures, id));
        let selected_id = selected.as_ref().map(|s| s.id.as_str());

        let items = lectures
            .iter()
            .map(|l| LectureItem {
                id: l.id.clone(),
                title: l.title.clone(),
                sort_order: l.sort_order,
                locked: !l.is_public,
                selected: selected_id == Some(l.id.as_str()),
            })
            .collect();

        Ok(CoursePage::Found(CourseDetailView {
            course: CourseCard::new(&course, lectures.len()),
            lectures: items,
            selected,
        }))
    }
}

fn select(lectures: &[Lecture], id: &str) -> Option<SelectedLecture> {
    let public: Vec<&Lecture> = lectures.iter().filter(|l| l.is_public).collect();
    let pos = public.iter().position(|l| l.id == id)?;
    let lecture = public[pos];
    Some(SelectedLecture {
        id: lecture.id.clone(),
        title: lecture.title.clone(),
        embed_url: lecture.youtube_url.clone(),
        pdf_url: lecture.pdf_url.clone(),
        thumbnail_url: lecture.thumbnail_url.clone(),
        previous: pos.checked_sub(1).map(|i| public[i].id.clone()),
        next: public.get(pos + 1).map(|l| l.id.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::InMemoryBackend;

    #[tokio::test]
    async fn home_features_newest_three_published() {
        let backend = InMemoryBackend::default();
        for i in 0..5 {
            let c = backend.store.seed_course(&format!("C{}", i), &format!("c{}", i), i != 4);
            backend.store.seed_lecture(&c.id, "L", 1, true);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let home = Catalog::new(&backend.repositories()).home().await.unwrap();

        let slugs: Vec<_> = home.featured.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["c3", "c2", "c1"]);
        assert!(home.featured.iter().all(|c| c.lecture_count == 1));
        assert_eq!(home.app.store_url, PLAY_STORE_URL);
    }

    #[tokio::test]
    async fn unpublished_course_is_not_found() {
        let backend = InMemoryBackend::default();
        backend.store.seed_course("Draft", "draft", false);

        let page = Catalog::new(&backend.repositories()).course_detail("draft", None).await.unwrap();
        match page {
            CoursePage::NotFound(view) => assert_eq!(view.back_href, "/courses"),
            CoursePage::Found(_) => panic!("draft course must not render"),
        }
    }

    #[tokio::test]
    async fn locked_lectures_hide_media_and_navigation_skips_them() {
        let backend = InMemoryBackend::default();
        let course = backend.store.seed_course("সহজ সূত্রে কুরআন শিখি", "quran-shikhi", true);
        let l1 = backend.store.seed_lecture(&course.id, "লেকচার ১", 1, true);
        let l2 = backend.store.seed_lecture(&course.id, "লেকচার ২", 2, false);
        let l3 = backend.store.seed_lecture(&course.id, "লেকচার ৩", 3, true);
        let catalog = Catalog::new(&backend.repositories());

        let CoursePage::Found(view) = catalog.course_detail("quran-shikhi", Some(&l1.id)).await.unwrap() else {
            panic!("expected course page");
        };
        assert_eq!(view.course.lecture_count, 3);
        assert_eq!(view.lectures.iter().map(|l| l.locked).collect::<Vec<_>>(), vec![false, true, false]);
        let selected = view.selected.unwrap();
        assert_eq!(selected.embed_url.as_deref(), Some("https://www.youtube.com/embed/1"));
        assert_eq!(selected.previous, None);
        assert_eq!(selected.next.as_deref(), Some(l3.id.as_str()));

        let CoursePage::Found(view) = catalog.course_detail("quran-shikhi", Some(&l2.id)).await.unwrap() else {
            panic!("expected course page");
        };
        assert!(view.selected.is_none());
        assert!(view.lectures.iter().all(|l| !l.selected));
    }
}
