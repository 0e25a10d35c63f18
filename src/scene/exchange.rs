//! Scene hand-off between a loader and a renderer.

pub use super::splat::SplatScene;

use std::sync::{Arc, Mutex, PoisonError};

/// The newest published scene, shared by threads.
#[derive(Debug, Default)]
pub struct SceneExchange {
    scene: Mutex<Option<Arc<SplatScene>>>,
}

impl SceneExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishing `scene` to replace the previous one.
    ///
    /// It returns the shared scene.
    pub fn publish(
        &self,
        scene: SplatScene,
    ) -> Arc<SplatScene> {
        let scene = Arc::new(scene);

        log::info!(
            target: "gausplat::viewer::scene::exchange",
            "publish > {:?}",
            scene.id(),
        );

        *self.lock() = Some(scene.to_owned());
        scene
    }

    /// The newest published scene.
    pub fn latest(&self) -> Option<Arc<SplatScene>> {
        self.lock().to_owned()
    }

    /// Taking the newest published scene out.
    pub fn take(&self) -> Option<Arc<SplatScene>> {
        self.lock().take()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Arc<SplatScene>>> {
        self.scene.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn publish_and_latest() {
        use super::*;

        let exchange = SceneExchange::new();
        assert!(exchange.latest().is_none());

        let first = exchange.publish(SplatScene::random(3, 0));
        let second = exchange.publish(SplatScene::random(5, 0));
        assert_ne!(first.id(), second.id());

        let output = exchange.latest().unwrap();
        assert_eq!(output.id(), second.id());
        assert_eq!(output.point_count(), 5);
        // The previous scene stays alive for its holders.
        assert_eq!(first.point_count(), 3);

        let output = exchange.take().unwrap();
        assert_eq!(output.id(), second.id());
        assert!(exchange.latest().is_none());
    }

    #[test]
    fn publish_from_threads() {
        use super::*;
        use std::thread;

        let exchange = Arc::new(SceneExchange::new());
        let handles = (0..4)
            .map(|seed| {
                let exchange = exchange.to_owned();
                thread::spawn(move || exchange.publish(SplatScene::random(2, seed)).id())
            })
            .collect::<Vec<_>>();
        let ids = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>();

        let output = exchange.latest().unwrap().id();
        assert!(ids.contains(&output));
    }
}
