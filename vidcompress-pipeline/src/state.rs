//! Codec state machines and the per-cycle decision table.
//!
//! The transcode loop drives a decoder and an encoder from one thread. Each
//! codec is tracked by a [`CodecMachine`]; which codec to poll next is a
//! pure function of the two states, [`next_step`].

/// Where one codec stands from the loop's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecState {
    /// Output is drained; the codec waits for more input.
    NeedsInput,
    /// Output may be pending and should be polled.
    HasOutput,
    /// Input has ended; remaining output is pending.
    Draining,
    /// End of stream reached on the output side.
    Done,
}

/// State of one codec plus whether its input side has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecMachine {
    state: CodecState,
    input_ended: bool,
}

impl Default for CodecMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecMachine {
    /// A codec that has not produced anything yet.
    pub fn new() -> Self {
        Self {
            state: CodecState::NeedsInput,
            input_ended: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> CodecState {
        self.state
    }

    /// Whether output reached end of stream.
    pub fn is_done(&self) -> bool {
        self.state == CodecState::Done
    }

    /// Whether end of stream was sent to the input side.
    pub fn input_ended(&self) -> bool {
        self.input_ended
    }

    /// Record that end of stream was sent to the input side.
    pub fn end_input(&mut self) {
        self.input_ended = true;
        if self.state == CodecState::NeedsInput {
            self.state = CodecState::Draining;
        }
    }

    /// Mark output as worth polling again.
    pub fn rearm(&mut self) {
        if self.state != CodecState::Done {
            self.state = CodecState::HasOutput;
        }
    }

    /// The codec had nothing within the poll timeout.
    pub fn on_try_again(&mut self) {
        if self.state != CodecState::Done {
            self.state = if self.input_ended {
                CodecState::Draining
            } else {
                CodecState::NeedsInput
            };
        }
    }

    /// The codec returned a buffer or a status change.
    pub fn on_output(&mut self) {
        if self.state != CodecState::Done {
            self.state = CodecState::HasOutput;
        }
    }

    /// The codec returned its end-of-stream buffer.
    pub fn on_end_of_stream(&mut self) {
        self.input_ended = true;
        self.state = CodecState::Done;
    }
}

/// What the loop does next within a poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The encoder finished; leave the loop.
    Finish,
    /// Poll the encoder.
    DrainEncoder,
    /// Poll the decoder.
    DrainDecoder,
    /// Nothing pending; start the next cycle.
    Idle,
}

/// Decide the next step from the two codec states.
///
/// Encoder output always goes first so its output buffers never back up.
pub fn next_step(decoder: CodecState, encoder: CodecState) -> Step {
    match (decoder, encoder) {
        (_, CodecState::Done) => Step::Finish,
        (_, CodecState::HasOutput) => Step::DrainEncoder,
        (CodecState::HasOutput, _) => Step::DrainDecoder,
        _ => Step::Idle,
    }
}

/// Coarse pipeline phase, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    /// Compressed samples are still fed to the decoder.
    Feeding,
    /// Input ended; the decoder drains.
    DecodeDrain,
    /// The decoder finished; the encoder has not been told yet.
    EosDecoder,
    /// The encoder drains its last frames.
    EncodeDrain,
    /// The encoder finished.
    EosEncoder,
    /// Resources released after success.
    Done,
    /// Stopped by an error.
    Failed,
}

impl PipelinePhase {
    /// Phase implied by the codec machines.
    pub fn from_machines(decoder: &CodecMachine, encoder: &CodecMachine) -> Self {
        if encoder.is_done() {
            PipelinePhase::EosEncoder
        } else if encoder.input_ended() {
            PipelinePhase::EncodeDrain
        } else if decoder.is_done() {
            PipelinePhase::EosDecoder
        } else if decoder.input_ended() {
            PipelinePhase::DecodeDrain
        } else {
            PipelinePhase::Feeding
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CodecState; 4] = [
        CodecState::NeedsInput,
        CodecState::HasOutput,
        CodecState::Draining,
        CodecState::Done,
    ];

    #[test]
    fn test_encoder_done_always_finishes() {
        for decoder in ALL {
            assert_eq!(next_step(decoder, CodecState::Done), Step::Finish);
        }
    }

    #[test]
    fn test_encoder_output_drained_first() {
        for decoder in ALL {
            assert_eq!(next_step(decoder, CodecState::HasOutput), Step::DrainEncoder);
        }
    }

    #[test]
    fn test_decoder_drained_when_encoder_idle() {
        for encoder in [CodecState::NeedsInput, CodecState::Draining] {
            assert_eq!(next_step(CodecState::HasOutput, encoder), Step::DrainDecoder);
            for decoder in [CodecState::NeedsInput, CodecState::Draining, CodecState::Done] {
                assert_eq!(next_step(decoder, encoder), Step::Idle);
            }
        }
    }

    #[test]
    fn test_machine_transitions() {
        let mut machine = CodecMachine::new();
        machine.rearm();
        assert_eq!(machine.state(), CodecState::HasOutput);
        machine.on_try_again();
        assert_eq!(machine.state(), CodecState::NeedsInput);

        machine.end_input();
        assert_eq!(machine.state(), CodecState::Draining);
        machine.rearm();
        machine.on_output();
        assert_eq!(machine.state(), CodecState::HasOutput);
        machine.on_try_again();
        assert_eq!(machine.state(), CodecState::Draining);

        machine.on_end_of_stream();
        machine.rearm();
        machine.on_output();
        machine.on_try_again();
        assert!(machine.is_done());
    }

    #[test]
    fn test_phase_follows_machines() {
        let mut decoder = CodecMachine::new();
        let mut encoder = CodecMachine::new();
        assert_eq!(PipelinePhase::from_machines(&decoder, &encoder), PipelinePhase::Feeding);
        decoder.end_input();
        assert_eq!(PipelinePhase::from_machines(&decoder, &encoder), PipelinePhase::DecodeDrain);
        decoder.on_end_of_stream();
        assert_eq!(PipelinePhase::from_machines(&decoder, &encoder), PipelinePhase::EosDecoder);
        encoder.end_input();
        assert_eq!(PipelinePhase::from_machines(&decoder, &encoder), PipelinePhase::EncodeDrain);
        encoder.on_end_of_stream();
        assert_eq!(PipelinePhase::from_machines(&decoder, &encoder), PipelinePhase::EosEncoder);
    }
}
