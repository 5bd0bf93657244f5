use triple_buffer::TripleBuffer;

/// Create a lock-free producer/consumer pair for pre-sized frames
///
/// The initial frame is cloned into all three slots, so it should already
/// have the capacity the producer will need. Publishing then only writes into
/// existing storage and never allocates on the audio thread.
pub fn frame_channel<T: Clone + Send>(initial: T) -> (FrameSender<T>, FrameReceiver<T>) {
    let (input, output) = TripleBuffer::new(&initial).split();
    (FrameSender { input }, FrameReceiver { output })
}

/// Audio thread side of the handoff
pub struct FrameSender<T: Send> {
    input: triple_buffer::Input<T>,
}

impl<T: Send> FrameSender<T> {
    /// Fill the back buffer in place and publish it
    /// Called from audio thread - must be real-time safe
    ///
    /// Returns `true` if the previously published frame had not been read yet
    /// and was replaced.
    pub fn publish_with(&mut self, fill: impl FnOnce(&mut T)) -> bool {
        fill(self.input.input_buffer_mut());
        self.input.publish()
    }

    /// Whether the consumer has picked up the last published frame
    pub fn consumed(&self) -> bool {
        self.input.consumed()
    }
}

/// Render thread side of the handoff
pub struct FrameReceiver<T: Send> {
    output: triple_buffer::Output<T>,
}

impl<T: Send> FrameReceiver<T> {
    /// Newest frame if one arrived since the last call, never blocks
    pub fn pop(&mut self) -> Option<&T> {
        if self.output.updated() {
            Some(self.output.read())
        } else {
            None
        }
    }

    /// Newest frame, whether or not it was seen before
    pub fn latest(&mut self) -> &T {
        self.output.read()
    }
}
