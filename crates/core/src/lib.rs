//! Webcam occupancy counting.
//!
//! Frames flow from a [`capture`] source through the [`detection`] face
//! counter, get annotated by [`overlay`], and the per-frame person count is
//! pushed to a [`telemetry`] sink no more often than the publish interval.
//! [`pipeline`] ties the stages into the perception loop.

pub mod capture {
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod detection;
        pub mod face_counter;
        pub mod face_detector;
        pub mod face_landmarks;
    }
    pub mod infrastructure;
}

pub mod display {
    pub mod domain {
        pub mod display_sink;
    }
    pub mod infrastructure;
}

pub mod overlay {
    pub mod glyphs;
    pub mod overlay_renderer;
}

pub mod pipeline {
    pub mod count_people_use_case;
    pub mod pipeline_logger;
}

pub mod shared {
    pub mod constants;
    pub mod frame;
}

pub mod telemetry {
    pub mod domain {
        pub mod clock;
        pub mod telemetry_sink;
        pub mod throttled_publisher;
    }
    pub mod infrastructure;
}
