use glam::Vec3;
use soundstage_audio::{Emitter, EmitterRef, RigidBody};
use std::cell::Cell;
use std::rc::Rc;

/// Emitter whose position tests move by hand.
#[derive(Debug)]
pub struct TestEmitter {
    position: Cell<Vec3>,
    body: Option<RigidBody>,
}

impl TestEmitter {
    /// Emitter with a resting rigid body at `position`.
    pub fn with_body(position: Vec3) -> Rc<Self> {
        Rc::new(Self {
            position: Cell::new(position),
            body: Some(RigidBody::default()),
        })
    }

    /// Emitter without a physical body (attachment must be refused).
    pub fn without_body(position: Vec3) -> Rc<Self> {
        Rc::new(Self {
            position: Cell::new(position),
            body: None,
        })
    }

    /// Teleport the emitter.
    pub fn move_to(&self, position: Vec3) {
        self.position.set(position);
    }

    /// Shared handle for play requests.
    pub fn handle(self: &Rc<Self>) -> EmitterRef {
        self.clone()
    }
}

impl Emitter for TestEmitter {
    fn position(&self) -> Vec3 {
        self.position.get()
    }

    fn rigid_body(&self) -> Option<RigidBody> {
        self.body
    }
}
