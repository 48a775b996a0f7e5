pub mod api {
    pub mod models {
        pub mod task;
    }
    pub mod backend;
    pub mod client;
    pub mod error;
}

pub mod logger;
