use crate::application::session::Viewer;
use crate::presentation::views::{AccountNavView, LayoutChrome, NavigationView, profile_href};

/// Builds the layout shell shared by every page.
#[derive(Clone)]
pub struct ChromeService {
    site_title: String,
}

impl ChromeService {
    pub fn new(site_title: impl Into<String>) -> Self {
        Self {
            site_title: site_title.into(),
        }
    }

    pub fn for_viewer(&self, viewer: Option<&Viewer>) -> LayoutChrome {
        let account = viewer.map(|viewer| AccountNavView {
            profile_href: profile_href(viewer.user.id),
            email: viewer.user.email.clone().unwrap_or_default(),
        });

        LayoutChrome {
            site_title: self.site_title.clone(),
            page_title: self.site_title.clone(),
            navigation: NavigationView { account },
        }
    }
}
