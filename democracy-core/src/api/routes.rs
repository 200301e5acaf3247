macro_rules! v1_path {
    ($path:literal) => {
        concat!("/api/v1", $path)
    };
}

/// Versioned API route definitions shared between the server and its clients
pub mod v1 {
    pub const ROOT: &str = "/api/v1";
    pub const VERSION: &str = "v1";

    pub mod auth {
        pub const LOGIN: &str = v1_path!("/auth/login");
        pub const LOGOUT: &str = v1_path!("/auth/logout");
        pub const ME: &str = v1_path!("/auth/me");
    }

    pub mod users {
        pub const COLLECTION: &str = v1_path!("/users");
        pub const ITEM: &str = v1_path!("/users/{id}");
        pub const EDIT: &str = v1_path!("/users/{id}/edit");
        pub const TOGGLE_ADMIN: &str = v1_path!("/users/{id}/admin");
    }

    pub mod groups {
        pub const COLLECTION: &str = v1_path!("/groups");
        pub const MEMBERS: &str = v1_path!("/groups/{id}/members");
    }

    pub mod votings {
        pub const COLLECTION: &str = v1_path!("/votings");
        pub const CANDIDATES: &str = v1_path!("/votings/{id}/candidates");
    }

    pub mod health {
        pub const CHECK: &str = "/health";
    }
}

/// Public path prefix under which stored photos are served.
pub const PHOTOS_PREFIX: &str = "/content/photos";

pub mod utils {
    /// Replace a single path parameter (e.g. `"{id}"`) with the provided value.
    pub fn replace_param(
        route: &str,
        param: &str,
        value: impl AsRef<str>,
    ) -> String {
        route.replace(param, value.as_ref())
    }
}
