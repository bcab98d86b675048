use quadreveal::{
    FrameCmd, ManualClock, Player, Quadrant, RecordingSink, Sequencer, SequencerParams, Stage,
};

fn play(target: u8) -> RecordingSink {
    let mut sequencer = Sequencer::new(
        SequencerParams::default(),
        Quadrant::from_id(target).unwrap(),
    )
    .unwrap();
    let player = Player::new(ManualClock::new());
    let mut sink = RecordingSink::default();
    player.play(&mut sequencer, &mut sink).unwrap();
    sink
}

#[test]
fn reveal_orders_source_then_selection_then_result() {
    let sink = play(9);

    let first_index_of = |pred: fn(&FrameCmd) -> bool| {
        sink.frames
            .iter()
            .position(|(_, cmds)| cmds.iter().any(pred))
            .unwrap()
    };

    let source = first_index_of(|c| matches!(c, FrameCmd::DrawSource { .. }));
    let highlight = first_index_of(|c| matches!(c, FrameCmd::DrawHighlight { .. }));
    let selection = first_index_of(|c| matches!(c, FrameCmd::DrawSelection { .. }));
    let result = first_index_of(|c| matches!(c, FrameCmd::DrawResult { .. }));

    assert!(source < highlight);
    assert!(highlight < selection);
    assert!(selection < result);
}

#[test]
fn move_highlight_emits_exactly_nine_frames_for_target_9() {
    let sink = play(9);
    let highlight_frames = sink
        .frames
        .iter()
        .flat_map(|(_, cmds)| cmds.iter())
        .filter(|c| matches!(c, FrameCmd::DrawHighlight { .. }))
        .count();
    assert_eq!(highlight_frames, 9);

    // The first post-highlight frame belongs to FadeSelection.
    let last_highlight = sink
        .frames
        .iter()
        .rposition(|(_, cmds)| {
            cmds.iter()
                .any(|c| matches!(c, FrameCmd::DrawHighlight { .. }))
        })
        .unwrap();
    let (next_state, next_cmds) = &sink.frames[last_highlight + 1];
    assert!(matches!(next_cmds[0], FrameCmd::DrawSelection { .. }));
    assert!(matches!(
        next_state.stage,
        Stage::FadeSelection | Stage::FadeResult
    ));
}

#[test]
fn fade_opacities_reach_exactly_one() {
    let sink = play(2);
    let mut last_source = 0.0;
    let mut last_selection = 0.0;
    let mut last_result = 0.0;
    for (_, cmds) in &sink.frames {
        for cmd in cmds {
            match *cmd {
                FrameCmd::DrawSource { opacity } => last_source = opacity,
                FrameCmd::DrawSelection { opacity } => last_selection = opacity,
                FrameCmd::DrawResult { opacity } => last_result = opacity,
                _ => {}
            }
        }
    }
    assert_eq!(last_source, 1.0);
    assert_eq!(last_selection, 1.0);
    assert_eq!(last_result, 1.0);
}
