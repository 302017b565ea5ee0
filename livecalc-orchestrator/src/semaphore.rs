//! A tiny counting semaphore bounding worker concurrency, built on
//! `parking_lot`'s mutex/condvar the way the rest of the crate uses them
//! rather than pulling in a dedicated semaphore crate for one primitive.

use parking_lot::{Condvar, Mutex};

pub struct Semaphore {
    permits: Mutex<usize>,
    condvar: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            condvar: Condvar::new(),
        }
    }

    pub fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.condvar.wait(&mut permits);
        }
        *permits -= 1;
    }

    pub fn release(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        self.condvar.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn blocks_past_the_permit_count() {
        let sem = Arc::new(Semaphore::new(1));
        sem.acquire();
        let sem2 = sem.clone();
        let handle = std::thread::spawn(move || {
            sem2.acquire();
            sem2.release();
        });
        std::thread::sleep(std::time::Duration::from_millis(10));
        sem.release();
        handle.join().unwrap();
    }
}
