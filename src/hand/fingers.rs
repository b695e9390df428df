use super::handedness::Handedness;
use super::landmark::{HandLandmarkIndex, HandLandmarks, Landmark};

/// 親指の水平移動量に対する閾値 (親指長さに対する比)
pub const THUMB_EXTENSION_RATIO: f32 = 0.4;

/// 指の種類 (親指から小指の順)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];
}

/// 親指以外の指の (先端, PIP関節)
pub const LONG_FINGER_JOINTS: [(Finger, HandLandmarkIndex, HandLandmarkIndex); 4] = [
    (Finger::Index, HandLandmarkIndex::IndexTip, HandLandmarkIndex::IndexPip),
    (Finger::Middle, HandLandmarkIndex::MiddleTip, HandLandmarkIndex::MiddlePip),
    (Finger::Ring, HandLandmarkIndex::RingTip, HandLandmarkIndex::RingPip),
    (Finger::Pinky, HandLandmarkIndex::PinkyTip, HandLandmarkIndex::PinkyPip),
];

/// 先端が関節より上 (画像座標でyが小さい) なら伸びている
pub fn is_long_finger_extended(tip: &Landmark, joint: &Landmark) -> bool {
    tip.y < joint.y
}

/// 親指は主に水平方向に動くので、水平距離を親指長さで正規化して判定する。
///
/// `handedness` はモデルの生ラベル。Right は先端が IP 関節より左、
/// それ以外は右にあるときに伸びているとみなす。
pub fn is_thumb_extended(
    tip: &Landmark,
    proximal: &Landmark,
    metacarpal: &Landmark,
    handedness: Handedness,
) -> bool {
    let x_distance = (tip.x - proximal.x).abs();
    let thumb_length = (tip.x - metacarpal.x).abs();
    let threshold = thumb_length * THUMB_EXTENSION_RATIO;

    let far_enough = x_distance > threshold;
    let outward = match handedness {
        Handedness::Right => tip.x < proximal.x,
        Handedness::Left | Handedness::Unknown => tip.x > proximal.x,
    };

    far_enough && outward
}

/// 各指の伸展状態 ([`Finger::ALL`] の順)
pub fn extended_fingers(hand: &HandLandmarks, handedness: Handedness) -> [bool; 5] {
    let mut states = [false; 5];

    states[0] = is_thumb_extended(
        hand.get(HandLandmarkIndex::ThumbTip),
        hand.get(HandLandmarkIndex::ThumbIp),
        hand.get(HandLandmarkIndex::ThumbMcp),
        handedness,
    );

    for (i, (_, tip, joint)) in LONG_FINGER_JOINTS.iter().enumerate() {
        states[i + 1] = is_long_finger_extended(hand.get(*tip), hand.get(*joint));
    }

    states
}

/// 伸びている指の本数 (0〜5)
pub fn count_extended_fingers(hand: &HandLandmarks, handedness: Handedness) -> u8 {
    extended_fingers(hand, handedness)
        .iter()
        .filter(|&&up| up)
        .count() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 画面上で手のひらを向けた右ラベルの手。親指は左に開く
    fn open_hand() -> HandLandmarks {
        let mut hand = HandLandmarks::default();
        hand.set(HandLandmarkIndex::Wrist, Landmark::new(0.5, 0.9));
        hand.set(HandLandmarkIndex::ThumbCmc, Landmark::new(0.45, 0.85));
        hand.set(HandLandmarkIndex::ThumbMcp, Landmark::new(0.40, 0.78));
        hand.set(HandLandmarkIndex::ThumbIp, Landmark::new(0.35, 0.72));
        hand.set(HandLandmarkIndex::ThumbTip, Landmark::new(0.28, 0.66));
        for (_, tip, joint) in LONG_FINGER_JOINTS {
            hand.set(joint, Landmark::new(0.5, 0.55));
            hand.set(tip, Landmark::new(0.5, 0.35));
        }
        hand
    }

    fn fist() -> HandLandmarks {
        let mut hand = fist_base();
        for (_, tip, joint) in LONG_FINGER_JOINTS {
            hand.set(joint, Landmark::new(0.5, 0.6));
            hand.set(tip, Landmark::new(0.5, 0.7));
        }
        hand
    }

    fn fist_base() -> HandLandmarks {
        let mut hand = HandLandmarks::default();
        hand.set(HandLandmarkIndex::Wrist, Landmark::new(0.5, 0.9));
        hand.set(HandLandmarkIndex::ThumbCmc, Landmark::new(0.45, 0.85));
        hand.set(HandLandmarkIndex::ThumbMcp, Landmark::new(0.42, 0.78));
        // 先端はIP関節のほぼ真上に折り込まれている
        hand.set(HandLandmarkIndex::ThumbIp, Landmark::new(0.44, 0.72));
        hand.set(HandLandmarkIndex::ThumbTip, Landmark::new(0.445, 0.70));
        hand
    }

    #[test]
    fn test_long_finger_extended() {
        let joint = Landmark::new(0.5, 0.5);
        assert!(is_long_finger_extended(&Landmark::new(0.5, 0.3), &joint));
        assert!(!is_long_finger_extended(&Landmark::new(0.5, 0.7), &joint));
    }

    #[test]
    fn test_long_finger_boundary_is_not_extended() {
        let joint = Landmark::new(0.2, 0.5);
        let tip = Landmark::new(0.8, 0.5);
        assert!(!is_long_finger_extended(&tip, &joint));
    }

    #[test]
    fn test_long_finger_ignores_x() {
        let joint = Landmark::new(0.9, 0.5);
        let tip = Landmark::new(0.1, 0.49);
        assert!(is_long_finger_extended(&tip, &joint));
    }

    #[test]
    fn test_thumb_right_extended_to_the_left() {
        // |0.2-0.3| = 0.1 > 0.4 * |0.2-0.4| = 0.08
        let tip = Landmark::new(0.2, 0.5);
        let proximal = Landmark::new(0.3, 0.5);
        let metacarpal = Landmark::new(0.4, 0.5);
        assert!(is_thumb_extended(&tip, &proximal, &metacarpal, Handedness::Right));
        assert!(!is_thumb_extended(&tip, &proximal, &metacarpal, Handedness::Left));
    }

    #[test]
    fn test_thumb_left_extended_to_the_right() {
        let tip = Landmark::new(0.8, 0.5);
        let proximal = Landmark::new(0.7, 0.5);
        let metacarpal = Landmark::new(0.6, 0.5);
        assert!(is_thumb_extended(&tip, &proximal, &metacarpal, Handedness::Left));
        assert!(!is_thumb_extended(&tip, &proximal, &metacarpal, Handedness::Right));
    }

    #[test]
    fn test_thumb_magnitude_below_threshold() {
        // 向きは正しいが |0.29-0.3| = 0.01 <= 0.4 * |0.29-0.5| = 0.084
        let tip = Landmark::new(0.29, 0.5);
        let proximal = Landmark::new(0.3, 0.5);
        let metacarpal = Landmark::new(0.5, 0.5);
        assert!(!is_thumb_extended(&tip, &proximal, &metacarpal, Handedness::Right));
    }

    #[test]
    fn test_thumb_magnitude_equal_threshold_is_not_extended() {
        // x_distance == threshold: tip=0.0, proximal=0.4, metacarpal=1.0
        let tip = Landmark::new(0.0, 0.5);
        let proximal = Landmark::new(0.4, 0.5);
        let metacarpal = Landmark::new(1.0, 0.5);
        assert!(!is_thumb_extended(&tip, &proximal, &metacarpal, Handedness::Right));
    }

    #[test]
    fn test_thumb_vertical_motion_ignored() {
        let tip = Landmark::new(0.3, 0.1);
        let proximal = Landmark::new(0.3, 0.5);
        let metacarpal = Landmark::new(0.35, 0.7);
        assert!(!is_thumb_extended(&tip, &proximal, &metacarpal, Handedness::Right));
        assert!(!is_thumb_extended(&tip, &proximal, &metacarpal, Handedness::Left));
    }

    #[test]
    fn test_thumb_unknown_uses_left_direction() {
        let tip = Landmark::new(0.8, 0.5);
        let proximal = Landmark::new(0.7, 0.5);
        let metacarpal = Landmark::new(0.6, 0.5);
        assert!(is_thumb_extended(&tip, &proximal, &metacarpal, Handedness::Unknown));
    }

    #[test]
    fn test_open_hand_counts_five() {
        assert_eq!(count_extended_fingers(&open_hand(), Handedness::Right), 5);
    }

    #[test]
    fn test_open_hand_wrong_label_loses_thumb() {
        assert_eq!(count_extended_fingers(&open_hand(), Handedness::Left), 4);
    }

    #[test]
    fn test_fist_counts_zero() {
        assert_eq!(count_extended_fingers(&fist(), Handedness::Right), 0);
        assert_eq!(count_extended_fingers(&fist(), Handedness::Left), 0);
    }

    #[test]
    fn test_partial_hand() {
        let mut hand = fist();
        // 人差し指と中指だけ立てる
        hand.set(HandLandmarkIndex::IndexTip, Landmark::new(0.5, 0.3));
        hand.set(HandLandmarkIndex::MiddleTip, Landmark::new(0.5, 0.3));

        let states = extended_fingers(&hand, Handedness::Right);
        assert_eq!(states, [false, true, true, false, false]);
        assert_eq!(count_extended_fingers(&hand, Handedness::Right), 2);
    }

    #[test]
    fn test_count_in_range_for_degenerate_hand() {
        let hand = HandLandmarks::default();
        for h in [Handedness::Left, Handedness::Right, Handedness::Unknown] {
            assert!(count_extended_fingers(&hand, h) <= 5);
        }
    }
}
