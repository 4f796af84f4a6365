// Shared memory backend tests for Linux
// Run with: cargo test --test shared_memory -- --nocapture

#[cfg(target_os = "linux")]
mod linux_tests {
    use semq::queue::QueueBuilder;
    use semq::sys::{attach_segment, create_segment, heap_segment, unlink_segment, RawHandle};
    use std::sync::Arc;

    #[test]
    #[serial_test::serial]
    fn create_segment_basics() {
        let name = "semq-test-create";
        let _ = unlink_segment(name);

        let size = 4096;
        let shm = create_segment(name, size).unwrap();
        assert_eq!(shm.size(), size);
        assert!(!shm.as_ptr().is_null());

        match shm.raw_handle() {
            RawHandle::Fd(fd) => assert!(fd > 0, "file descriptor should be positive"),
            RawHandle::Heap => panic!("named segment reported a heap handle"),
        }

        // Fresh mapping is zero-filled and writable.
        unsafe {
            let slice = std::slice::from_raw_parts_mut(shm.as_ptr(), size);
            assert!(slice.iter().all(|&b| b == 0));
            slice[0] = 0x42;
            assert_eq!(slice[0], 0x42);
        }

        unlink_segment(name).unwrap();
    }

    #[test]
    #[serial_test::serial]
    fn attach_sees_creator_writes() {
        let name = "semq-test-attach";
        let _ = unlink_segment(name);

        let size = 8192;
        let created = create_segment(name, size).unwrap();
        unsafe {
            let slice = std::slice::from_raw_parts_mut(created.as_ptr(), size);
            for i in 0..100 {
                slice[i] = (i % 256) as u8;
            }
        }

        let attached = attach_segment(name, size).unwrap();
        assert_eq!(attached.size(), size);
        unsafe {
            let slice = std::slice::from_raw_parts(attached.as_ptr(), size);
            for i in 0..100 {
                assert_eq!(slice[i], (i % 256) as u8);
            }
        }

        unlink_segment(name).unwrap();
    }

    #[test]
    #[serial_test::serial]
    fn attach_missing_segment_fails() {
        let name = "semq-test-missing";
        let _ = unlink_segment(name);

        let err = attach_segment(name, 4096).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    #[serial_test::serial]
    fn attach_undersized_segment_fails() {
        let name = "semq-test-small";
        let _ = unlink_segment(name);

        let _created = create_segment(name, 1024).unwrap();
        let err = attach_segment(name, 4096).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

        unlink_segment(name).unwrap();
    }

    #[test]
    #[serial_test::serial]
    fn queue_create_then_attach_round_trip() {
        let name = "semq-test-queue";
        let _ = unlink_segment(name);

        let owner = Arc::new(QueueBuilder::new(name).capacity(4).create().unwrap());
        let attached = Arc::new(QueueBuilder::new(name).attach().unwrap());
        assert_eq!(attached.capacity(), 4);

        // A message written through one mapping is read through the other.
        let producer = owner.producer();
        let consumer = attached.consumer();
        producer.send(5, &[1, 2, 3]).unwrap();

        let delivery = consumer.recv();
        assert_eq!(delivery.message.kind, 5);
        assert_eq!(delivery.message.data(), &[1, 2, 3]);
        assert!(delivery.checksum_ok);

        // Both views agree on the counters.
        assert_eq!(owner.stats(), attached.stats());

        // The owner unlinks the name once every endpoint is gone.
        drop(producer);
        drop(consumer);
        drop(attached);
        drop(owner);
        assert!(attach_segment(name, 1).is_err());
    }

    // Corruption between enqueue and dequeue is reported through the
    // delivery verdict, and the message is consumed regardless.
    #[test]
    #[serial_test::serial]
    fn corrupted_slot_reports_mismatch_but_is_consumed() {
        use semq::queue::layout::{Message, QueueHeader};
        use std::mem::size_of;

        let name = "semq-test-corrupt";
        let _ = unlink_segment(name);

        let queue = Arc::new(QueueBuilder::new(name).capacity(4).create().unwrap());
        let producer = queue.producer();
        let consumer = queue.consumer();

        producer.send(1, &[10, 20, 30]).unwrap();

        // Flip a declared payload byte of slot 0 through a raw mapping
        // of the same region.
        let raw = attach_segment(name, size_of::<QueueHeader>()).unwrap();
        let payload_offset = size_of::<QueueHeader>() + memoffset::offset_of!(Message, payload);
        unsafe {
            let byte = raw.as_ptr().add(payload_offset);
            *byte = (*byte).wrapping_add(1);
        }

        let delivery = consumer.recv();
        assert!(!delivery.checksum_ok);
        assert_eq!(delivery.message.data(), &[11, 20, 30]);

        // Consumed despite the mismatch.
        let stats = queue.stats();
        assert_eq!(stats.consumed_total, 1);
        assert_eq!(stats.count, 0);
    }

    #[test]
    #[serial_test::serial]
    fn queue_attach_rejects_foreign_segment() {
        let name = "semq-test-foreign";
        let _ = unlink_segment(name);

        // A segment that was never initialized as a queue: zeroed
        // header, so the magic check fails.
        let _raw = create_segment(name, 65536).unwrap();
        let err = QueueBuilder::new(name).attach().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

        unlink_segment(name).unwrap();
    }

    #[test]
    fn heap_segment_is_zeroed() {
        let shm = heap_segment(4096).unwrap();
        assert_eq!(shm.size(), 4096);
        unsafe {
            let slice = std::slice::from_raw_parts(shm.as_ptr(), 4096);
            assert!(slice.iter().all(|&b| b == 0));
        }
        match shm.raw_handle() {
            RawHandle::Heap => {}
            RawHandle::Fd(_) => panic!("heap segment reported a file descriptor"),
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod non_linux_tests {
    use semq::sys::{attach_segment, create_segment};

    #[test]
    fn named_segments_unsupported() {
        let err = create_segment("semq-test", 4096).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);

        let err = attach_segment("semq-test", 4096).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
    }
}
