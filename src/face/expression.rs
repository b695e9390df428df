/// 表情の固定語彙。宣言順が同点時の優先順になる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Expression {
    Neutral = 0,
    Happy = 1,
    Sad = 2,
    Angry = 3,
    Fearful = 4,
    Disgusted = 5,
    Surprised = 6,
}

impl Expression {
    pub const COUNT: usize = 7;

    /// 優先順 (同点なら先に現れる方が勝つ)
    pub const ALL: [Expression; Expression::COUNT] = [
        Expression::Neutral,
        Expression::Happy,
        Expression::Sad,
        Expression::Angry,
        Expression::Fearful,
        Expression::Disgusted,
        Expression::Surprised,
    ];

    /// 分類器が使うキー名
    pub fn name(&self) -> &'static str {
        match self {
            Expression::Neutral => "neutral",
            Expression::Happy => "happy",
            Expression::Sad => "sad",
            Expression::Angry => "angry",
            Expression::Fearful => "fearful",
            Expression::Disgusted => "disgusted",
            Expression::Surprised => "surprised",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.name() == name)
    }

    /// 画面表示用 (スペイン語)
    pub fn display_name(&self) -> &'static str {
        match self {
            Expression::Neutral => "Neutral",
            Expression::Happy => "Feliz",
            Expression::Sad => "Triste",
            Expression::Angry => "Enojado",
            Expression::Fearful => "Temeroso",
            Expression::Disgusted => "Disgustado",
            Expression::Surprised => "Sorprendido",
        }
    }
}

/// 表情ごとの信頼度
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExpressionScores {
    scores: [f32; Expression::COUNT],
}

impl ExpressionScores {
    /// (名前, スコア) の組から作る。語彙にない名前は無視し、欠けている表情は 0
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        let mut scores = Self::default();
        for (name, score) in pairs {
            match Expression::from_name(name) {
                Some(expr) => scores.set(expr, score),
                None => log::debug!("Ignoring unknown expression '{}'", name),
            }
        }
        scores
    }

    pub fn get(&self, expression: Expression) -> f32 {
        self.scores[expression as usize]
    }

    pub fn set(&mut self, expression: Expression, score: f32) {
        self.scores[expression as usize] = score;
    }

    /// 最大スコアの表情。同点は [`Expression::ALL`] で先の方
    pub fn dominant(&self) -> (Expression, f32) {
        let mut best = (Expression::ALL[0], self.get(Expression::ALL[0]));
        for &expr in &Expression::ALL[1..] {
            let score = self.get(expr);
            if score > best.1 {
                best = (expr, score);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_roundtrip() {
        for expr in Expression::ALL {
            assert_eq!(Expression::from_name(expr.name()), Some(expr));
        }
        assert_eq!(Expression::from_name("contempt"), None);
    }

    #[test]
    fn test_all_matches_discriminant_order() {
        for (i, expr) in Expression::ALL.iter().enumerate() {
            assert_eq!(*expr as usize, i);
        }
    }

    #[test]
    fn test_dominant() {
        let scores = ExpressionScores::from_pairs([
            ("neutral", 0.1),
            ("happy", 0.7),
            ("sad", 0.05),
            ("surprised", 0.15),
        ]);
        assert_eq!(scores.dominant(), (Expression::Happy, 0.7));
    }

    #[test]
    fn test_dominant_tie_prefers_vocabulary_order() {
        let scores = ExpressionScores::from_pairs([("happy", 0.5), ("neutral", 0.5)]);
        assert_eq!(scores.dominant().0, Expression::Neutral);

        let scores = ExpressionScores::from_pairs([("surprised", 0.4), ("angry", 0.4)]);
        assert_eq!(scores.dominant().0, Expression::Angry);
    }

    #[test]
    fn test_dominant_all_zero_is_neutral() {
        let scores = ExpressionScores::default();
        assert_eq!(scores.dominant(), (Expression::Neutral, 0.0));
    }

    #[test]
    fn test_unknown_names_ignored() {
        let scores = ExpressionScores::from_pairs([("contempt", 0.9), ("sad", 0.2)]);
        assert_eq!(scores.dominant(), (Expression::Sad, 0.2));
        assert_eq!(scores.get(Expression::Happy), 0.0);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(Expression::Happy.display_name(), "Feliz");
        assert_eq!(Expression::Surprised.display_name(), "Sorprendido");
    }
}
